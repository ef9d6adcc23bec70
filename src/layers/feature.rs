//! Features and the remote, viewport-driven feature collection.
//!
//! Geometry is kept in native coordinates. A [`RemoteFeatureCollection`]
//! never fetches anything itself: when the view settles it plans
//! [`FeatureRequest`]s, and the results are handed back through
//! [`RemoteFeatureCollection::receive`].

use crate::core::constants::MAX_TILE_ZOOM;
use crate::core::extent::Extent;
use crate::core::geo::{Coordinate, Crs, TileCoord};
use crate::prelude::HashMap;
use crate::spatial::index::{SpatialIndex, SpatialItem};
use crate::traits::ViewportAware;
use geo::{BoundingRect, Contains, EuclideanDistance};
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identifier of a feature inside its layer, e.g. `stop.4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of the stop with the given stop ID.
    pub fn stop(stop_id: impl std::fmt::Display) -> Self {
        Self(format!(
            "{}.{}",
            crate::core::constants::STOP_FEATURE_PREFIX,
            stop_id
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    /// Native coordinates.
    pub geometry: Geometry<f64>,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub selected: bool,
}

impl Feature {
    pub fn new(id: impl Into<FeatureId>, geometry: Geometry<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: serde_json::Map::new(),
            selected: false,
        }
    }

    pub fn point(id: impl Into<FeatureId>, at: Coordinate) -> Self {
        Self::new(id, Geometry::Point(Point::new(at.x, at.y)))
    }

    pub fn with_property(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn extent(&self) -> Option<Extent> {
        let rect = self.geometry.bounding_rect()?;
        Extent::native(rect.min().x, rect.min().y, rect.max().x, rect.max().y).ok()
    }

    /// Representative point used for pixel placement.
    pub fn anchor(&self) -> Option<Coordinate> {
        match &self.geometry {
            Geometry::Point(p) => Some(Coordinate::new(p.x(), p.y())),
            _ => self.extent().map(|e| e.center()),
        }
    }

    /// Native distance from `coord` to the geometry; zero inside areas.
    pub fn distance_to(&self, coord: &Coordinate) -> f64 {
        let point = Point::new(coord.x, coord.y);
        match &self.geometry {
            Geometry::Point(p) => point.euclidean_distance(p),
            Geometry::MultiPoint(mp) => point.euclidean_distance(mp),
            Geometry::LineString(ls) => point.euclidean_distance(ls),
            Geometry::MultiLineString(mls) => point.euclidean_distance(mls),
            Geometry::Polygon(poly) => {
                if poly.contains(&point) {
                    0.0
                } else {
                    point.euclidean_distance(poly)
                }
            }
            Geometry::MultiPolygon(mpoly) => {
                if mpoly.contains(&point) {
                    0.0
                } else {
                    point.euclidean_distance(mpoly)
                }
            }
            _ => self
                .extent()
                .map(|e| {
                    let dx = (e.min_x() - coord.x).max(coord.x - e.max_x()).max(0.0);
                    let dy = (e.min_y() - coord.y).max(coord.y - e.max_y()).max(0.0);
                    dx.hypot(dy)
                })
                .unwrap_or(f64::INFINITY),
        }
    }
}

/// Features of one layer, indexed for hit-testing.
///
/// Later insertions are drawn on top of earlier ones, so hit results are
/// ordered newest first.
#[derive(Default)]
pub struct FeatureStore {
    features: HashMap<FeatureId, (u64, Feature)>,
    index: SpatialIndex<u64>,
    next_seq: u64,
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a feature unless one with the same id is already loaded.
    ///
    /// Reloading a region must not reset the selection state of features
    /// already on the map, so duplicates are ignored.
    pub fn insert(&mut self, feature: Feature) -> bool {
        if self.features.contains_key(&feature.id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(bounds) = feature.extent() {
            self.index
                .insert(SpatialItem::new(feature.id.to_string(), bounds, seq));
        }
        self.features.insert(feature.id.clone(), (seq, feature));
        true
    }

    /// Inserts or overwrites a feature, moving it to the top.
    pub fn replace(&mut self, feature: Feature) {
        self.remove(&feature.id);
        self.insert(feature);
    }

    pub fn remove(&mut self, id: &FeatureId) -> Option<Feature> {
        let (_, feature) = self.features.remove(id)?;
        self.index.remove(id.as_str());
        Some(feature)
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id).map(|(_, f)| f)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    /// Sets the selection flag; returns true if it changed.
    pub fn set_selected(&mut self, id: &FeatureId, selected: bool) -> bool {
        match self.features.get_mut(id) {
            Some((_, feature)) if feature.selected != selected => {
                feature.selected = selected;
                true
            }
            _ => false,
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Feature> {
        self.features.values().map(|(_, f)| f).filter(|f| f.selected)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values().map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.index.clear();
    }

    /// Features within `tolerance` native units of `coord`, top-most first.
    pub fn hit(&self, coord: &Coordinate, tolerance: f64) -> Vec<&Feature> {
        let mut hits: Vec<(u64, &Feature)> = self
            .index
            .query_radius(coord, tolerance)
            .into_iter()
            .filter_map(|item| self.features.get(&FeatureId::new(item.id.as_str())))
            .filter(|(_, f)| f.distance_to(coord) <= tolerance)
            .map(|(seq, f)| (*seq, f))
            .collect();
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.into_iter().map(|(_, f)| f).collect()
    }
}

impl std::fmt::Debug for FeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("len", &self.features.len())
            .finish()
    }
}

/// How a remote collection turns the visible extent into requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadingStrategy {
    /// One request per settled view: `<base>/<dataset>?bbox=w,s,e,n`.
    Bbox,
    /// XYZ tiles: `<base>/<dataset>/{z}/{x}/{y}`. Views below `min_zoom`
    /// request nothing; above `max_zoom` the `max_zoom` tiles are reused.
    Tiled { min_zoom: u8, max_zoom: u8 },
}

impl Default for LoadingStrategy {
    fn default() -> Self {
        LoadingStrategy::Bbox
    }
}

/// One fetch the collection wants performed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    /// Label of the requesting layer.
    pub layer: String,
    pub url: String,
    /// Geographic area the response covers.
    pub extent: Extent,
    pub tile: Option<TileCoord>,
}

/// Feature layer content loaded on demand as the viewport changes.
#[derive(Debug)]
pub struct RemoteFeatureCollection {
    label: String,
    base_url: String,
    dataset: String,
    strategy: LoadingStrategy,
    max_resolution: Option<f64>,
    store: FeatureStore,
    loaded_extents: Vec<Extent>,
    loaded_tiles: BTreeSet<TileCoord>,
    queued: Vec<FeatureRequest>,
    in_flight: usize,
}

impl RemoteFeatureCollection {
    pub fn new(
        label: impl Into<String>,
        base_url: impl Into<String>,
        dataset: impl Into<String>,
        strategy: LoadingStrategy,
    ) -> Self {
        Self {
            label: label.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dataset: dataset.into().trim_matches('/').to_string(),
            strategy,
            max_resolution: None,
            store: FeatureStore::new(),
            loaded_extents: Vec::new(),
            loaded_tiles: BTreeSet::new(),
            queued: Vec::new(),
            in_flight: 0,
        }
    }

    pub fn with_max_resolution(mut self, max_resolution: Option<f64>) -> Self {
        self.max_resolution = max_resolution;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn strategy(&self) -> LoadingStrategy {
        self.strategy
    }

    pub fn max_resolution(&self) -> Option<f64> {
        self.max_resolution
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FeatureStore {
        &mut self.store
    }

    /// Whether geometry is drawn and requested at `resolution`.
    pub fn in_range(&self, resolution: f64) -> bool {
        self.max_resolution.map_or(true, |max| resolution <= max)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0 || !self.queued.is_empty()
    }

    pub fn bbox_url(&self, extent: &Extent) -> String {
        format!(
            "{}/{}?bbox={}",
            self.base_url,
            self.dataset,
            extent.to_crs(Crs::Geographic).to_bbox_param()
        )
    }

    pub fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.base_url, self.dataset, tile.z, tile.x, tile.y
        )
    }

    /// Requests planned since the last call.
    pub fn take_requests(&mut self) -> Vec<FeatureRequest> {
        let requests = std::mem::take(&mut self.queued);
        self.in_flight += requests.len();
        requests
    }

    /// Stores the features of a completed request; returns how many were new.
    pub fn receive(&mut self, request: &FeatureRequest, features: Vec<Feature>) -> usize {
        self.in_flight = self.in_flight.saturating_sub(1);
        let added = features
            .into_iter()
            .map(|f| self.store.insert(f))
            .filter(|added| *added)
            .count();
        log::debug!(
            "{}: loaded {} new features from {}",
            self.label,
            added,
            request.url
        );
        added
    }

    /// Forgets a failed request so the area is requested again next time.
    pub fn request_failed(&mut self, request: &FeatureRequest) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.forget(request);
    }

    /// Drops planned requests nobody took; their areas are planned again on
    /// the next settled view. Returns how many were dropped.
    pub fn abandon_queued(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queued);
        for request in &queued {
            self.forget(request);
        }
        queued.len()
    }

    fn forget(&mut self, request: &FeatureRequest) {
        match request.tile {
            Some(tile) => {
                self.loaded_tiles.remove(&tile);
            }
            None => self.loaded_extents.retain(|e| e != &request.extent),
        }
    }

    fn plan_bbox(&mut self, view: &Extent) {
        let geographic = view.to_crs(Crs::Geographic);
        if self
            .loaded_extents
            .iter()
            .any(|loaded| loaded.contains_extent(&geographic))
        {
            return;
        }
        self.loaded_extents.push(geographic);
        self.queued.push(FeatureRequest {
            layer: self.label.clone(),
            url: self.bbox_url(&geographic),
            extent: geographic,
            tile: None,
        });
    }

    fn plan_tiles(&mut self, view: &Extent, zoom: f64, min_zoom: u8, max_zoom: u8) {
        if zoom < f64::from(min_zoom) {
            return;
        }
        let z = (zoom.floor() as u8).min(max_zoom).min(MAX_TILE_ZOOM);
        let native = view.to_crs(Crs::Native);
        let tiles = TileCoord::covering(
            native.min_x(),
            native.min_y(),
            native.max_x(),
            native.max_y(),
            z,
        );
        for tile in tiles {
            if !self.loaded_tiles.insert(tile) {
                continue;
            }
            self.queued.push(FeatureRequest {
                layer: self.label.clone(),
                url: self.tile_url(tile),
                extent: Extent::from_tile(&tile),
                tile: Some(tile),
            });
        }
    }
}

impl ViewportAware for RemoteFeatureCollection {
    fn on_view_settled(&mut self, extent: &Extent, resolution: f64, zoom: f64) {
        if !self.in_range(resolution) {
            return;
        }
        match self.strategy {
            LoadingStrategy::Bbox => self.plan_bbox(extent),
            LoadingStrategy::Tiled { min_zoom, max_zoom } => {
                self.plan_tiles(extent, zoom, min_zoom, max_zoom)
            }
        }
    }
}
