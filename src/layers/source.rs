use crate::core::geo::{Crs, TileCoord};
use std::fmt::Debug;

/// Tiling scheme of a raster source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub crs: Crs,
}

impl TileGrid {
    /// The standard global XYZ grid.
    pub fn web_mercator(max_zoom: u8) -> Self {
        Self {
            tile_size: crate::core::constants::TILE_SIZE,
            min_zoom: 0,
            max_zoom,
            crs: Crs::Native,
        }
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::web_mercator(19)
    }
}

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync + Debug {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;

    fn grid(&self) -> TileGrid {
        TileGrid::default()
    }

    fn attribution(&self) -> Option<&str> {
        None
    }
}

/// Simple implementation that hits the default OpenStreetMap tile server.
#[derive(Debug, Clone)]
pub struct OpenStreetMapSource {
    subdomains: Vec<&'static str>,
}

impl OpenStreetMapSource {
    pub fn new() -> Self {
        Self {
            subdomains: vec!["a", "b", "c"],
        }
    }
}

impl Default for OpenStreetMapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSource for OpenStreetMapSource {
    fn url(&self, coord: TileCoord) -> String {
        if self.subdomains.is_empty() {
            return format!(
                "https://tile.openstreetmap.org/{}/{}/{}.png",
                coord.z, coord.x, coord.y
            );
        }

        let idx = ((coord.x + coord.y) % self.subdomains.len() as u32) as usize;
        format!(
            "https://{}.tile.openstreetmap.org/{}/{}/{}.png",
            self.subdomains[idx], coord.z, coord.x, coord.y
        )
    }

    fn attribution(&self) -> Option<&str> {
        Some("© OpenStreetMap contributors")
    }
}

/// An XYZ source driven by a `{z}/{x}/{y}` URL template.
#[derive(Debug, Clone)]
pub struct XyzSource {
    template: String,
    grid: TileGrid,
    attribution: Option<String>,
}

impl XyzSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            grid: TileGrid::default(),
            attribution: None,
        }
    }

    /// 256px raster tiles rendered from a Mapbox style.
    pub fn mapbox(style: &str, access_token: Option<&str>) -> Self {
        let mut template = format!(
            "https://api.mapbox.com/styles/v1/{}/tiles/256/{{z}}/{{x}}/{{y}}",
            style
        );
        if let Some(token) = access_token {
            template.push_str("?access_token=");
            template.push_str(token);
        }
        Self::new(template).with_attribution("© Mapbox © OpenStreetMap")
    }

    pub fn with_grid(mut self, grid: TileGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileSource for XyzSource {
    fn url(&self, coord: TileCoord) -> String {
        self.template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
    }

    fn grid(&self) -> TileGrid {
        self.grid
    }

    fn attribution(&self) -> Option<&str> {
        self.attribution.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osm_subdomain_rotation() {
        let source = OpenStreetMapSource::new();
        assert_eq!(
            source.url(TileCoord::new(1, 1, 3)),
            "https://c.tile.openstreetmap.org/3/1/1.png"
        );
    }

    #[test]
    fn test_mapbox_template() {
        let source = XyzSource::mapbox("wylee/abc", Some("tok"));
        assert_eq!(
            source.url(TileCoord::new(5, 11, 5)),
            "https://api.mapbox.com/styles/v1/wylee/abc/tiles/256/5/5/11?access_token=tok"
        );
    }
}
