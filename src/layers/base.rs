use crate::layers::feature::{FeatureStore, RemoteFeatureCollection};
use crate::layers::location::UserLocationMarker;
use crate::layers::source::{TileGrid, TileSource};
use std::sync::Arc;

/// Position of a layer in its [`LayerSet`](crate::layers::manager::LayerSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Engine-side object backing a layer; opaque to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Raster,
    Debug,
    Features,
    Location,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Raster => write!(f, "raster"),
            LayerType::Debug => write!(f, "debug"),
            LayerType::Features => write!(f, "features"),
            LayerType::Location => write!(f, "location"),
        }
    }
}

#[derive(Debug)]
pub enum LayerKind {
    BaseRaster(Arc<dyn TileSource>),
    /// Tile outlines drawn over the grid of a reference raster source.
    DebugGrid(TileGrid),
    RemoteFeatures(RemoteFeatureCollection),
    UserLocation(UserLocationMarker),
}

#[derive(Debug)]
pub struct Layer {
    pub(crate) id: LayerId,
    label: String,
    short_label: Option<String>,
    pub(crate) visible: bool,
    kind: LayerKind,
    pub(crate) source: Option<SourceHandle>,
}

impl Layer {
    pub fn new(label: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: LayerId(0),
            label: label.into(),
            short_label: None,
            visible: true,
            kind,
            source: None,
        }
    }

    pub fn with_short_label(mut self, short_label: Option<String>) -> Self {
        self.short_label = short_label;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Short label, falling back to the label.
    pub fn short_label(&self) -> &str {
        self.short_label.as_deref().unwrap_or(&self.label)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn source(&self) -> Option<SourceHandle> {
        self.source
    }

    pub fn layer_type(&self) -> LayerType {
        match self.kind {
            LayerKind::BaseRaster(_) => LayerType::Raster,
            LayerKind::DebugGrid(_) => LayerType::Debug,
            LayerKind::RemoteFeatures(_) => LayerType::Features,
            LayerKind::UserLocation(_) => LayerType::Location,
        }
    }

    pub fn is_base(&self) -> bool {
        matches!(self.kind, LayerKind::BaseRaster(_) | LayerKind::DebugGrid(_))
    }

    /// Visible and, for feature layers, within the drawable resolution range.
    pub fn is_rendered(&self, resolution: f64) -> bool {
        match &self.kind {
            LayerKind::RemoteFeatures(remote) => self.visible && remote.in_range(resolution),
            _ => self.visible,
        }
    }

    pub fn features(&self) -> Option<&FeatureStore> {
        match &self.kind {
            LayerKind::RemoteFeatures(remote) => Some(remote.store()),
            LayerKind::UserLocation(marker) => Some(marker.store()),
            _ => None,
        }
    }

    pub fn remote(&self) -> Option<&RemoteFeatureCollection> {
        match &self.kind {
            LayerKind::RemoteFeatures(remote) => Some(remote),
            _ => None,
        }
    }

    pub fn remote_mut(&mut self) -> Option<&mut RemoteFeatureCollection> {
        match &mut self.kind {
            LayerKind::RemoteFeatures(remote) => Some(remote),
            _ => None,
        }
    }

    pub fn location_mut(&mut self) -> Option<&mut UserLocationMarker> {
        match &mut self.kind {
            LayerKind::UserLocation(marker) => Some(marker),
            _ => None,
        }
    }

    /// A hidden copy of a base layer sharing its tile source, for the overview.
    pub fn mirror(&self) -> Option<Layer> {
        let kind = match &self.kind {
            LayerKind::BaseRaster(source) => LayerKind::BaseRaster(Arc::clone(source)),
            LayerKind::DebugGrid(grid) => LayerKind::DebugGrid(*grid),
            _ => return None,
        };
        Some(Layer {
            id: self.id,
            label: self.label.clone(),
            short_label: self.short_label.clone(),
            visible: false,
            kind,
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::source::OpenStreetMapSource;

    #[test]
    fn test_short_label_falls_back() {
        let layer = Layer::new("OpenStreetMap", LayerKind::DebugGrid(TileGrid::default()));
        assert_eq!(layer.short_label(), "OpenStreetMap");
        let layer = layer.with_short_label(Some("OSM".to_string()));
        assert_eq!(layer.short_label(), "OSM");
        assert_eq!(layer.layer_type().to_string(), "debug");
    }

    #[test]
    fn test_mirror_only_base_layers() {
        let osm = Layer::new(
            "OpenStreetMap",
            LayerKind::BaseRaster(Arc::new(OpenStreetMapSource::new())),
        );
        let copy = osm.mirror().unwrap();
        assert_eq!(copy.label(), "OpenStreetMap");
        assert!(!copy.is_visible());

        let marker = Layer::new("You", LayerKind::UserLocation(UserLocationMarker::new()));
        assert!(marker.mirror().is_none());
    }
}
