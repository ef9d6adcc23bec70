//! # stopmap
//!
//! A map-view controller for transit stop maps.
//!
//! The crate owns the map's state and behavior and leaves drawing to a
//! [`RenderEngine`]: a main view with animated navigation, an ordered stack of
//! base, debug, feature and user-location layers, an overview mini-map that
//! follows the main view, and pointer events routed to the features under the
//! cursor. Everything runs on one thread, driven by
//! [`MapController::advance`]; network results come back through a channel.

pub mod animation;
pub mod core;
pub mod data;
pub mod engine;
pub mod geolocation;
pub mod input;
pub mod layers;
pub mod overview;
pub mod prelude;
pub mod spatial;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    builder::MapBuilder,
    config::MapConfig,
    extent::Extent,
    geo::{Coordinate, Crs, Pixel, Size, TileCoord},
    map::{MapController, SelectionStatus},
    view::ViewController,
};

pub use animation::{AnimationHandle, AnimationOutcome};

pub use data::{FeatureFetcher, HttpFeatureFetcher};

pub use engine::{HeadlessEngine, RenderEngine, RenderStatus, RenderSurface, SurfaceRole};

pub use geolocation::GeolocationSample;

pub use input::{EventKind, FeatureHit, FeatureListener, MapEvent, PointerEvent, Subscription};

pub use layers::{Feature, FeatureId, Layer, LayerFactory, LayerRequest, LayerType};

pub use overview::OverviewSynchronizer;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Duplicate layer label: {0}")]
    DuplicateLabel(String),

    #[error("No base layers configured")]
    NoBaseLayers,

    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Map is not attached to a render target")]
    ViewportNotAttached,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs an `env_logger` subscriber honoring `RUST_LOG`.
///
/// Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
