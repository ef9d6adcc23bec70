//! Position fixes pushed in by a geolocation provider.

use crate::core::geo::{to_native, Coordinate};
use serde::{Deserialize, Serialize};

/// One fix. `position` is native; `None` means the provider lost the fix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeolocationSample {
    pub position: Option<Coordinate>,
    /// Radius of the 95% confidence circle in meters.
    pub accuracy: Option<f64>,
}

impl GeolocationSample {
    pub fn new(position: Option<Coordinate>, accuracy: Option<f64>) -> Self {
        Self { position, accuracy }
    }

    /// A fix reported in longitude/latitude degrees.
    pub fn from_lon_lat(lon: f64, lat: f64, accuracy: Option<f64>) -> Self {
        Self {
            position: Some(to_native(Coordinate::new(lon, lat))),
            accuracy,
        }
    }

    pub fn lost() -> Self {
        Self::default()
    }
}

/// Drops fixes that are too imprecise to show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFilter {
    threshold: f64,
}

impl LocationFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Fixes without an accuracy estimate are accepted.
    pub fn accepts(&self, sample: &GeolocationSample) -> bool {
        sample.accuracy.map_or(true, |accuracy| accuracy <= self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_threshold() {
        let filter = LocationFilter::new(400.0);
        assert!(filter.accepts(&GeolocationSample::from_lon_lat(-122.6, 45.5, Some(15.0))));
        assert!(filter.accepts(&GeolocationSample::from_lon_lat(-122.6, 45.5, Some(400.0))));
        assert!(!filter.accepts(&GeolocationSample::from_lon_lat(-122.6, 45.5, Some(1200.0))));
        assert!(filter.accepts(&GeolocationSample::from_lon_lat(-122.6, 45.5, None)));
    }
}
