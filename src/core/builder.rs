//! Map builder for fluent controller configuration

use crate::core::config::MapConfig;
use crate::core::map::MapController;
use crate::engine::RenderEngine;
use crate::layers::factory::{LayerFactory, LayerRequest};
use crate::Result;

/// Builder for creating and configuring MapController instances
pub struct MapBuilder {
    config: MapConfig,
    requests: Vec<LayerRequest>,
}

impl MapBuilder {
    /// A builder with no layers
    pub fn new(config: MapConfig) -> Self {
        Self {
            config,
            requests: Vec::new(),
        }
    }

    /// A builder preloaded with the stop map's standard layers
    pub fn standard(config: MapConfig) -> Self {
        let requests = LayerFactory::standard(&config);
        Self {
            config,
            requests,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Append a layer request; layers render in the order they are added
    pub fn with_layer(mut self, request: LayerRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn with_layers<I: IntoIterator<Item = LayerRequest>>(mut self, requests: I) -> Self {
        self.requests.extend(requests);
        self
    }

    /// Build the controller; configuration mistakes surface here
    pub fn build(self, engine: &mut dyn RenderEngine) -> Result<MapController> {
        self.config.validate()?;
        let layers = self
            .requests
            .into_iter()
            .map(LayerFactory::build)
            .collect::<Result<Vec<_>>>()?;
        MapController::new(self.config, layers, engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;
    use crate::MapError;

    #[test]
    fn test_standard_build() {
        let map = MapBuilder::standard(MapConfig::default())
            .build(&mut HeadlessEngine::default())
            .unwrap();
        assert_eq!(map.base_layer().label(), "Map");
        assert_eq!(map.next_base_layer().label(), "Satellite");
        assert!(map.find_layer("Stops").is_ok());
    }

    #[test]
    fn test_build_without_base_layers_fails() {
        let result = MapBuilder::new(MapConfig::default()).build(&mut HeadlessEngine::default());
        assert!(matches!(result, Err(MapError::NoBaseLayers)));
    }

    #[test]
    fn test_invalid_config_fails() {
        let config = MapConfig {
            min_zoom: 15.0,
            max_zoom: 5.0,
            ..MapConfig::default()
        };
        let result = MapBuilder::standard(config).build(&mut HeadlessEngine::default());
        assert!(matches!(result, Err(MapError::InvalidConfig(_))));
    }
}
