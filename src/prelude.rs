//! Prelude module for common stopmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use stopmap::prelude::*;`

pub use crate::core::{
    builder::MapBuilder,
    config::MapConfig,
    extent::Extent,
    geo::{Coordinate, Crs, Pixel, Size, TileCoord},
    map::{MapController, SelectionStatus},
    view::ViewController,
};

pub use crate::layers::{
    base::{Layer, LayerId, LayerKind, LayerType},
    factory::{
        DebugLayerOptions, FeatureLayerOptions, LayerFactory, LayerRequest, RasterLayerOptions,
        RasterSource, UserLocationOptions,
    },
    feature::{Feature, FeatureId, FeatureRequest, LoadingStrategy},
    manager::LayerSet,
};

pub use crate::input::{
    events::{EventKind, Inbound, MapEvent, PointerEvent},
    listeners::Subscription,
    router::{FeatureHit, FeatureListener},
};

pub use crate::animation::{AnimationHandle, AnimationOutcome, EasingType};

pub use crate::data::{fulfill, FeatureFetcher, HttpFeatureFetcher};

pub use crate::engine::{HeadlessEngine, RenderEngine, RenderStatus, RenderSurface, SurfaceRole};

pub use crate::geolocation::GeolocationSample;

pub use crate::traits::ViewportAware;

pub use crate::{MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
