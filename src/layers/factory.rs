//! Typed layer construction requests and the factory that builds them.

use crate::core::config::MapConfig;
use crate::core::constants::*;
use crate::layers::base::{Layer, LayerKind};
use crate::layers::feature::{LoadingStrategy, RemoteFeatureCollection};
use crate::layers::location::UserLocationMarker;
use crate::layers::source::{OpenStreetMapSource, TileSource, XyzSource};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a raster layer gets its tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RasterSource {
    Mapbox {
        style: String,
        access_token: Option<String>,
    },
    OpenStreetMap,
    Xyz {
        template: String,
    },
}

impl RasterSource {
    fn into_tile_source(self) -> Arc<dyn TileSource> {
        match self {
            RasterSource::Mapbox {
                style,
                access_token,
            } => Arc::new(XyzSource::mapbox(&style, access_token.as_deref())),
            RasterSource::OpenStreetMap => Arc::new(OpenStreetMapSource::new()),
            RasterSource::Xyz { template } => Arc::new(XyzSource::new(template)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayerOptions {
    pub source: RasterSource,
    pub label: String,
    #[serde(default)]
    pub short_label: Option<String>,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLayerOptions {
    /// Raster source whose tiling scheme the grid outlines.
    pub reference: RasterSource,
    pub label: String,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayerOptions {
    pub label: String,
    pub base_url: String,
    pub dataset: String,
    #[serde(default)]
    pub strategy: LoadingStrategy,
    /// Native units per pixel above which nothing is drawn or requested.
    #[serde(default)]
    pub max_resolution: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocationOptions {
    pub label: String,
}

/// A closed set of layer construction requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerRequest {
    BaseRaster(RasterLayerOptions),
    DebugGrid(DebugLayerOptions),
    RemoteFeatures(FeatureLayerOptions),
    UserLocation(UserLocationOptions),
}

impl LayerRequest {
    pub fn label(&self) -> &str {
        match self {
            LayerRequest::BaseRaster(o) => &o.label,
            LayerRequest::DebugGrid(o) => &o.label,
            LayerRequest::RemoteFeatures(o) => &o.label,
            LayerRequest::UserLocation(o) => &o.label,
        }
    }
}

pub struct LayerFactory;

impl LayerFactory {
    pub fn build(request: LayerRequest) -> Result<Layer> {
        if request.label().trim().is_empty() {
            return Err(MapError::InvalidConfig("layer label is empty".to_string()));
        }
        let layer = match request {
            LayerRequest::BaseRaster(options) => {
                Layer::new(options.label, LayerKind::BaseRaster(options.source.into_tile_source()))
                    .with_short_label(options.short_label)
                    .with_visible(options.visible)
            }
            LayerRequest::DebugGrid(options) => {
                let grid = options.reference.into_tile_source().grid();
                Layer::new(options.label, LayerKind::DebugGrid(grid)).with_visible(options.visible)
            }
            LayerRequest::RemoteFeatures(options) => Self::remote_features(options)?,
            LayerRequest::UserLocation(options) => {
                Layer::new(options.label, LayerKind::UserLocation(UserLocationMarker::new()))
                    .with_visible(false)
            }
        };
        log::debug!("built {} layer {:?}", layer.layer_type(), layer.label());
        Ok(layer)
    }

    fn remote_features(options: FeatureLayerOptions) -> Result<Layer> {
        if options.base_url.trim().is_empty() || options.dataset.trim().is_empty() {
            return Err(MapError::InvalidConfig(format!(
                "feature layer {:?} needs a base URL and a dataset",
                options.label
            )));
        }
        if let LoadingStrategy::Tiled { min_zoom, max_zoom } = options.strategy {
            if min_zoom > max_zoom {
                return Err(MapError::InvalidConfig(format!(
                    "feature layer {:?}: tile min_zoom {} exceeds max_zoom {}",
                    options.label, min_zoom, max_zoom
                )));
            }
            if max_zoom > MAX_TILE_ZOOM {
                return Err(MapError::InvalidConfig(format!(
                    "feature layer {:?}: tile max_zoom {} is above {}",
                    options.label, max_zoom, MAX_TILE_ZOOM
                )));
            }
        }
        if let Some(max) = options.max_resolution {
            if !(max > 0.0) {
                return Err(MapError::InvalidConfig(format!(
                    "feature layer {:?}: max_resolution must be positive",
                    options.label
                )));
            }
        }
        let remote = RemoteFeatureCollection::new(
            options.label.clone(),
            options.base_url,
            options.dataset,
            options.strategy,
        )
        .with_max_resolution(options.max_resolution);
        Ok(Layer::new(options.label, LayerKind::RemoteFeatures(remote)))
    }

    /// The stop map's layers in render order: base layers, stops, user location.
    pub fn standard(config: &MapConfig) -> Vec<LayerRequest> {
        let token = config.mapbox_access_token.clone();
        let streets = RasterSource::Mapbox {
            style: MAPBOX_STREETS_STYLE.to_string(),
            access_token: token.clone(),
        };
        let mut requests = Vec::new();
        if config.debug {
            requests.push(LayerRequest::DebugGrid(DebugLayerOptions {
                reference: streets.clone(),
                label: "Debug".to_string(),
                visible: true,
            }));
        }
        requests.push(LayerRequest::BaseRaster(RasterLayerOptions {
            source: streets,
            label: "Map".to_string(),
            short_label: None,
            visible: !config.debug,
        }));
        requests.push(LayerRequest::BaseRaster(RasterLayerOptions {
            source: RasterSource::Mapbox {
                style: MAPBOX_SATELLITE_STYLE.to_string(),
                access_token: token,
            },
            label: "Satellite".to_string(),
            short_label: None,
            visible: false,
        }));
        requests.push(LayerRequest::BaseRaster(RasterLayerOptions {
            source: RasterSource::OpenStreetMap,
            label: "OpenStreetMap".to_string(),
            short_label: Some("OSM".to_string()),
            visible: false,
        }));
        requests.push(LayerRequest::RemoteFeatures(FeatureLayerOptions {
            label: STOPS_LAYER_LABEL.to_string(),
            base_url: config.api_url.clone(),
            dataset: "stops".to_string(),
            strategy: LoadingStrategy::Bbox,
            max_resolution: Some(config.feature_max_resolution),
        }));
        requests.push(LayerRequest::UserLocation(UserLocationOptions {
            label: "User Location".to_string(),
        }));
        requests
    }
}
