//! Configuration for the map controller.
//!
//! Defaults mirror the deployed stop map. A config can be deserialized from
//! JSON, overridden from the environment, and must pass [`MapConfig::validate`]
//! before a controller is built from it.

use crate::animation::easing::EasingType;
use crate::core::constants::*;
use crate::core::geo::Coordinate;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENV_DEBUG: &str = "STOPMAP_DEBUG";
const ENV_API_URL: &str = "STOPMAP_API_URL";
const ENV_MAPBOX_TOKEN: &str = "STOPMAP_MAPBOX_ACCESS_TOKEN";
const ENV_MIN_ZOOM: &str = "STOPMAP_MIN_ZOOM";
const ENV_MAX_ZOOM: &str = "STOPMAP_MAX_ZOOM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial center in geographic coordinates (lon, lat).
    pub initial_center: Coordinate,
    pub initial_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Snap computed zooms (fit, animations) to whole levels.
    pub constrain_resolution: bool,
    pub animation_duration_ms: u64,
    /// Curve of programmatic view animations on the main view.
    pub easing: EasingType,
    pub overview_zoom: f64,
    pub overview_animation_ms: u64,
    /// Base URL of the stops API.
    pub api_url: String,
    pub mapbox_access_token: Option<String>,
    /// Adds the tile debug grid as the initially visible base layer.
    pub debug: bool,
    /// Native units per pixel above which feature geometry is not requested.
    pub feature_max_resolution: f64,
    /// Location fixes with an accuracy radius above this (meters) are dropped.
    pub location_accuracy_threshold: f64,
    pub hit_tolerance_px: f64,
    /// `None` retries a pending selection until it resolves or is cancelled.
    pub max_selection_retries: Option<u32>,
    /// Feature layer that `set_selected_features` operates on.
    pub selection_layer: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_center: Coordinate::new(-122.67, 45.52),
            initial_zoom: 12.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            constrain_resolution: true,
            animation_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
            easing: EasingType::default(),
            overview_zoom: DEFAULT_OVERVIEW_ZOOM,
            overview_animation_ms: DEFAULT_ANIMATION_DURATION_MS,
            api_url: "http://localhost:8000".to_string(),
            mapbox_access_token: None,
            debug: false,
            feature_max_resolution: FEATURE_LAYER_MAX_RESOLUTION,
            location_accuracy_threshold: USER_LOCATION_ACCURACY_THRESHOLD,
            hit_tolerance_px: DEFAULT_HIT_TOLERANCE_PX,
            max_selection_retries: Some(DEFAULT_MAX_SELECTION_RETRIES),
            selection_layer: STOPS_LAYER_LABEL.to_string(),
        }
    }
}

impl MapConfig {
    /// Parses a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `STOPMAP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug = matches!(value.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = lookup(ENV_MAPBOX_TOKEN) {
            self.mapbox_access_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(value) = lookup(ENV_MIN_ZOOM) {
            self.min_zoom = parse_number(ENV_MIN_ZOOM, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_ZOOM) {
            self.max_zoom = parse_number(ENV_MAX_ZOOM, &value)?;
        }
        Ok(())
    }

    /// Rejects option combinations that cannot produce a working map.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) {
            return Err(MapError::InvalidConfig("zoom limits must be finite".into()));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::InvalidConfig(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.overview_zoom.is_finite() || self.overview_zoom < 0.0 {
            return Err(MapError::InvalidConfig(format!(
                "overview_zoom {} is not a valid zoom",
                self.overview_zoom
            )));
        }
        if self.feature_max_resolution <= 0.0 {
            return Err(MapError::InvalidConfig(
                "feature_max_resolution must be positive".into(),
            ));
        }
        if self.hit_tolerance_px < 0.0 {
            return Err(MapError::InvalidConfig(
                "hit_tolerance_px must not be negative".into(),
            ));
        }
        if self.api_url.is_empty() {
            return Err(MapError::InvalidConfig("api_url is empty".into()));
        }
        Ok(())
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    pub fn overview_animation(&self) -> Duration {
        Duration::from_millis(self.overview_animation_ms)
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| MapError::InvalidConfig(format!("{}={:?}: {}", key, value, e)))
}
