//! Feature event routing: raw pointer events in, hit or miss callbacks out.

use crate::core::geo::{Coordinate, Size};
use crate::core::view::ViewController;
use crate::input::debounce::Debouncer;
use crate::input::events::PointerEvent;
use crate::layers::base::LayerId;
use crate::layers::feature::Feature;
use crate::layers::manager::LayerSet;
use std::time::Duration;

/// The feature found under a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHit {
    pub feature: Feature,
    pub layer: LayerId,
    pub layer_label: String,
    pub event: PointerEvent,
    /// Native coordinate under the pointer.
    pub coordinate: Coordinate,
}

/// Finds the top-most feature under a pointer event.
pub trait HitTester {
    fn hit_test(&self, event: &PointerEvent, only: Option<LayerId>) -> Option<FeatureHit>;
}

/// Hit-tests against a layer set as currently shown by a view.
pub struct HitContext<'a> {
    pub layers: &'a LayerSet,
    pub view: &'a ViewController,
    pub size: Option<Size>,
    pub tolerance_px: f64,
}

impl HitTester for HitContext<'_> {
    fn hit_test(&self, event: &PointerEvent, only: Option<LayerId>) -> Option<FeatureHit> {
        let coordinate = self.view.coordinate_from_pixel(event.pixel, self.size)?;
        let resolution = self.view.resolution();
        let tolerance = self.tolerance_px * resolution;
        let (layer, feature) = self
            .layers
            .hit_test(&coordinate, tolerance, resolution, only)?;
        Some(FeatureHit {
            feature: feature.clone(),
            layer: layer.id(),
            layer_label: layer.label().to_string(),
            event: *event,
            coordinate,
        })
    }
}

pub type HitCallback = Box<dyn FnMut(&FeatureHit)>;
pub type MissCallback = Box<dyn FnMut(&PointerEvent)>;

/// Callbacks and options of a feature listener.
pub struct FeatureListener {
    on_hit: HitCallback,
    on_miss: Option<MissCallback>,
    only_layer: Option<String>,
    debounce: Option<Duration>,
}

impl FeatureListener {
    pub fn new<F>(on_hit: F) -> Self
    where
        F: FnMut(&FeatureHit) + 'static,
    {
        Self {
            on_hit: Box::new(on_hit),
            on_miss: None,
            only_layer: None,
            debounce: None,
        }
    }

    /// Called instead of `on_hit` when nothing is under the pointer.
    pub fn on_miss<F>(mut self, on_miss: F) -> Self
    where
        F: FnMut(&PointerEvent) + 'static,
    {
        self.on_miss = Some(Box::new(on_miss));
        self
    }

    /// Only consider features of the layer labeled `label`.
    pub fn only_layer(mut self, label: impl Into<String>) -> Self {
        self.only_layer = Some(label.into());
        self
    }

    /// Deliver only the last event of a burst, `delay` after it.
    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = Some(delay).filter(|d| !d.is_zero());
        self
    }

    pub fn layer_filter(&self) -> Option<&str> {
        self.only_layer.as_deref()
    }
}

impl std::fmt::Debug for FeatureListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureListener")
            .field("only_layer", &self.only_layer)
            .field("debounce", &self.debounce)
            .field("on_miss", &self.on_miss.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Hit,
    Miss,
    /// Nothing was hit and no miss callback is set.
    Ignored,
    /// Held back by the debounce timer.
    Deferred,
}

impl Delivery {
    pub fn delivered(&self) -> bool {
        matches!(self, Delivery::Hit | Delivery::Miss)
    }
}

/// A registered feature listener with its resolved layer filter and timer.
pub(crate) struct FeatureRoute {
    listener: FeatureListener,
    only: Option<LayerId>,
    debouncer: Option<Debouncer<PointerEvent>>,
}

impl FeatureRoute {
    pub(crate) fn new(listener: FeatureListener, only: Option<LayerId>) -> Self {
        let debouncer = listener.debounce.map(Debouncer::new);
        Self {
            listener,
            only,
            debouncer,
        }
    }

    pub(crate) fn on_event(
        &mut self,
        event: &PointerEvent,
        now: Duration,
        tester: &dyn HitTester,
    ) -> Delivery {
        match self.debouncer.as_mut() {
            Some(debouncer) => {
                debouncer.push(*event, now);
                Delivery::Deferred
            }
            None => self.deliver(event, tester),
        }
    }

    /// Delivers a debounced event whose quiet period has elapsed.
    pub(crate) fn poll(&mut self, now: Duration, tester: &dyn HitTester) -> Option<Delivery> {
        let event = self.debouncer.as_mut()?.poll(now)?;
        Some(self.deliver(&event, tester))
    }

    pub(crate) fn deadline(&self) -> Option<Duration> {
        self.debouncer.as_ref().and_then(|d| d.deadline())
    }

    fn deliver(&mut self, event: &PointerEvent, tester: &dyn HitTester) -> Delivery {
        match tester.hit_test(event, self.only) {
            Some(hit) => {
                (self.listener.on_hit)(&hit);
                Delivery::Hit
            }
            None => match self.listener.on_miss.as_mut() {
                Some(on_miss) => {
                    on_miss(event);
                    Delivery::Miss
                }
                None => Delivery::Ignored,
            },
        }
    }
}
