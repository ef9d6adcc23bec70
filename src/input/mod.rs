pub mod debounce;
pub mod events;
pub mod listeners;
pub mod router;

pub use debounce::Debouncer;
pub use events::{EventKind, Inbound, MapEvent, PointerEvent};
pub use listeners::{ListenerKey, ListenerRegistry, Subscription};
pub use router::{FeatureHit, FeatureListener, HitContext, HitTester};
