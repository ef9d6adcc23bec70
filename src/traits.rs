//! Shared trait abstractions used across modules.

use crate::core::geo::Coordinate;

/// Unified interpolation trait used by view transitions.
pub trait Lerp {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Coordinate {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Coordinate::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }
}

/// Components that react to the settled view after a move.
pub trait ViewportAware {
    /// Called with the native extent and resolution once the view stops moving.
    fn on_view_settled(&mut self, extent: &crate::core::extent::Extent, resolution: f64, zoom: f64);
}
