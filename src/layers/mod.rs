pub mod base;
pub mod factory;
pub mod feature;
pub mod location;
pub mod manager;
pub mod source;

pub use base::{Layer, LayerId, LayerKind, LayerType, SourceHandle};
pub use factory::{LayerFactory, LayerRequest};
pub use feature::{Feature, FeatureId, FeatureRequest, FeatureStore, LoadingStrategy};
pub use manager::LayerSet;
