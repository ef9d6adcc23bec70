use crate::core::geo::Coordinate;
use crate::layers::base::{Layer, LayerId};
use crate::layers::feature::Feature;
use crate::prelude::HashSet;
use crate::{MapError, Result};

/// Ordered layers of one map, back to front.
///
/// Exactly one base layer is visible at any time.
#[derive(Debug)]
pub struct LayerSet {
    layers: Vec<Layer>,
    /// Indices into `layers` of the base layers, in order.
    base: Vec<usize>,
}

impl LayerSet {
    /// Validates labels and normalizes base-layer visibility.
    ///
    /// When several base layers are marked visible the first one wins; when
    /// none is, the first base layer is shown.
    pub fn new(mut layers: Vec<Layer>) -> Result<Self> {
        let mut labels = HashSet::default();
        for layer in &layers {
            if !labels.insert(layer.label().to_string()) {
                return Err(MapError::DuplicateLabel(layer.label().to_string()));
            }
        }

        let base: Vec<usize> = layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_base())
            .map(|(i, _)| i)
            .collect();
        if base.is_empty() {
            return Err(MapError::NoBaseLayers);
        }

        for (i, layer) in layers.iter_mut().enumerate() {
            layer.id = LayerId(i);
        }

        let mut set = Self { layers, base };
        let shown = set
            .base
            .iter()
            .position(|&i| set.layers[i].visible)
            .unwrap_or(0);
        set.set_visible_base(shown);
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in render order.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut()
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id.0)
    }

    pub fn find(&self, label: &str) -> Result<&Layer> {
        self.layers
            .iter()
            .find(|l| l.label() == label)
            .ok_or_else(|| MapError::LayerNotFound(label.to_string()))
    }

    pub fn find_mut(&mut self, label: &str) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.label() == label)
            .ok_or_else(|| MapError::LayerNotFound(label.to_string()))
    }

    pub fn base_layers(&self) -> impl Iterator<Item = &Layer> {
        self.base.iter().map(move |&i| &self.layers[i])
    }

    pub fn base_count(&self) -> usize {
        self.base.len()
    }

    /// Position of the visible layer among the base layers.
    pub fn visible_base_index(&self) -> usize {
        self.base
            .iter()
            .position(|&i| self.layers[i].visible)
            .unwrap_or(0)
    }

    pub fn visible_base(&self) -> &Layer {
        &self.layers[self.base[self.visible_base_index()]]
    }

    /// Base layer `offset` positions after the visible one, wrapping around.
    pub fn base_after(&self, offset: usize) -> &Layer {
        let index = (self.visible_base_index() + offset) % self.base.len();
        &self.layers[self.base[index]]
    }

    /// Position of the base layer labeled `label` among the base layers.
    pub fn base_index_of(&self, label: &str) -> Result<usize> {
        self.base
            .iter()
            .position(|&i| self.layers[i].label() == label)
            .ok_or_else(|| MapError::LayerNotFound(label.to_string()))
    }

    /// Shows the base layer at `index` (modulo the base count) and hides the rest.
    pub fn set_visible_base(&mut self, index: usize) {
        let index = index % self.base.len();
        for (n, &i) in self.base.iter().enumerate() {
            self.layers[i].visible = n == index;
        }
    }

    /// Advances the visible base layer by one; returns its new position.
    pub fn rotate_base(&mut self) -> usize {
        let next = (self.visible_base_index() + 1) % self.base.len();
        self.set_visible_base(next);
        next
    }

    /// Top-most feature within `tolerance` of `coord` on a rendered layer.
    ///
    /// Layers are searched front to back; `only` restricts the search to one
    /// layer.
    pub fn hit_test(
        &self,
        coord: &Coordinate,
        tolerance: f64,
        resolution: f64,
        only: Option<LayerId>,
    ) -> Option<(&Layer, &Feature)> {
        self.layers
            .iter()
            .rev()
            .filter(|layer| only.map_or(true, |id| layer.id() == id))
            .filter(|layer| layer.is_rendered(resolution))
            .find_map(|layer| {
                let store = layer.features()?;
                store
                    .hit(coord, tolerance)
                    .into_iter()
                    .next()
                    .map(|feature| (layer, feature))
            })
    }
}
