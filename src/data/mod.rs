pub mod fetch;
pub mod geojson;

pub use fetch::{fulfill, FeatureFetcher, HttpFeatureFetcher};
pub use geojson::{decode_features, GeoJson, GeoJsonFeature, GeoJsonGeometry};
