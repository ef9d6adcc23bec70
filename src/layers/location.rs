use crate::core::constants::USER_LOCATION_FEATURE_ID;
use crate::core::geo::Coordinate;
use crate::layers::feature::{Feature, FeatureId, FeatureStore};

/// Holds the single marker feature of the user's position.
#[derive(Debug, Default)]
pub struct UserLocationMarker {
    store: FeatureStore,
}

impl UserLocationMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the marker to a native `position`, replacing any previous fix.
    pub fn show(&mut self, position: Coordinate, accuracy: Option<f64>) {
        let mut marker = Feature::point(USER_LOCATION_FEATURE_ID, position);
        if let Some(accuracy) = accuracy {
            marker = marker.with_property("accuracy", serde_json::json!(accuracy));
        }
        self.store.replace(marker);
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn position(&self) -> Option<Coordinate> {
        self.store
            .get(&FeatureId::new(USER_LOCATION_FEATURE_ID))
            .and_then(|f| f.anchor())
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_replaces_previous_fix() {
        let mut marker = UserLocationMarker::new();
        assert!(marker.position().is_none());
        marker.show(Coordinate::new(1.0, 2.0), Some(30.0));
        marker.show(Coordinate::new(3.0, 4.0), None);
        assert_eq!(marker.store().len(), 1);
        assert_eq!(marker.position(), Some(Coordinate::new(3.0, 4.0)));
        marker.clear();
        assert!(marker.store().is_empty());
    }
}
