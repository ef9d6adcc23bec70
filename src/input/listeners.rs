//! Listener registry and the owned subscriptions handed to callers.
//!
//! Entries are taken out of the registry while their callback runs, so a
//! callback may release its own (or any other) subscription without
//! re-entering a borrowed registry.

use crate::input::events::{EventKind, MapEvent};
use crate::input::router::{Delivery, FeatureRoute, HitTester};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};
use std::time::Duration;

pub type EventCallback = Box<dyn FnMut(&MapEvent)>;

/// Opaque key of one registration, unique within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerKey(u64);

pub(crate) enum Handler {
    Event(EventCallback),
    Feature(FeatureRoute),
}

pub(crate) struct Entry {
    kind: EventKind,
    once: bool,
    handler: Handler,
}

#[derive(Default)]
pub struct ListenerRegistry {
    next_key: u64,
    entries: BTreeMap<ListenerKey, Entry>,
    /// Keys whose entry is checked out for dispatch.
    in_flight: BTreeSet<ListenerKey>,
    /// In-flight keys released during their dispatch.
    released: BTreeSet<ListenerKey>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, kind: EventKind, once: bool, handler: Handler) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.entries.insert(key, Entry { kind, once, handler });
        key
    }

    /// Unregisters `key`; false if it was not active.
    pub fn release(&mut self, key: ListenerKey) -> bool {
        if self.entries.remove(&key).is_some() {
            return true;
        }
        self.in_flight.contains(&key) && self.released.insert(key)
    }

    pub fn is_active(&self, key: ListenerKey) -> bool {
        self.entries.contains_key(&key)
            || (self.in_flight.contains(&key) && !self.released.contains(&key))
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.entries.len() + self.in_flight.len() - self.released.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases everything, dropping pending debounce timers; returns the count.
    pub fn clear(&mut self) -> usize {
        let count = self.len();
        self.entries.clear();
        self.released.extend(self.in_flight.iter().copied());
        count
    }

    fn keys_for(&self, kind: EventKind) -> Vec<ListenerKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(key, _)| *key)
            .collect()
    }

    fn timer_keys(&self, now: Duration) -> Vec<ListenerKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| match &entry.handler {
                Handler::Feature(route) => route.deadline().map_or(false, |d| d <= now),
                Handler::Event(_) => false,
            })
            .map(|(key, _)| *key)
            .collect()
    }

    fn begin(&mut self, key: ListenerKey) -> Option<Entry> {
        let entry = self.entries.remove(&key)?;
        self.in_flight.insert(key);
        Some(entry)
    }

    fn finish(&mut self, key: ListenerKey, entry: Entry, delivered: bool) {
        self.in_flight.remove(&key);
        let released = self.released.remove(&key);
        if !released && !(entry.once && delivered) {
            self.entries.insert(key, entry);
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("active", &self.len())
            .finish()
    }
}

/// An owned registration. Releasing it is idempotent, and detaching the map
/// releases every subscription it handed out.
///
/// Dropping a subscription does not release it: the listener stays
/// registered until [`release`](Self::release) or detach, so callers may
/// register fire-and-forget listeners and discard the handle.
#[derive(Debug)]
pub struct Subscription {
    key: ListenerKey,
    kind: EventKind,
    registry: Weak<RefCell<ListenerRegistry>>,
}

impl Subscription {
    pub(crate) fn new(
        key: ListenerKey,
        kind: EventKind,
        registry: &Rc<RefCell<ListenerRegistry>>,
    ) -> Self {
        Self {
            key,
            kind,
            registry: Rc::downgrade(registry),
        }
    }

    pub fn key(&self) -> ListenerKey {
        self.key
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unregisters the listener; returns false if it was already gone.
    pub fn release(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let released = match registry.try_borrow_mut() {
            Ok(mut r) => r.release(self.key),
            Err(_) => false,
        };
        released
    }

    pub fn is_active(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let active = match registry.try_borrow() {
            Ok(r) => r.is_active(self.key),
            Err(_) => false,
        };
        active
    }
}

/// Delivers `event` to every listener registered for its kind, in
/// registration order. Returns the number of callbacks invoked.
pub(crate) fn dispatch(
    registry: &Rc<RefCell<ListenerRegistry>>,
    event: &MapEvent,
    now: Duration,
    tester: &dyn HitTester,
) -> usize {
    let keys = registry.borrow().keys_for(event.kind());
    let mut invoked = 0;
    for key in keys {
        let Some(mut entry) = registry.borrow_mut().begin(key) else {
            continue;
        };
        let delivered = match (&mut entry.handler, event) {
            (Handler::Event(callback), _) => {
                callback(event);
                true
            }
            (Handler::Feature(route), MapEvent::Pointer(pointer)) => {
                route.on_event(pointer, now, tester).delivered()
            }
            (Handler::Feature(_), _) => false,
        };
        if delivered {
            invoked += 1;
        }
        registry.borrow_mut().finish(key, entry, delivered);
    }
    invoked
}

/// Fires debounced feature deliveries that are due at `now`.
pub(crate) fn fire_due(
    registry: &Rc<RefCell<ListenerRegistry>>,
    now: Duration,
    tester: &dyn HitTester,
) -> usize {
    let keys = registry.borrow().timer_keys(now);
    let mut invoked = 0;
    for key in keys {
        let Some(mut entry) = registry.borrow_mut().begin(key) else {
            continue;
        };
        let delivered = match &mut entry.handler {
            Handler::Feature(route) => route
                .poll(now, tester)
                .map_or(false, |d: Delivery| d.delivered()),
            Handler::Event(_) => false,
        };
        if delivered {
            invoked += 1;
        }
        registry.borrow_mut().finish(key, entry, delivered);
    }
    invoked
}
