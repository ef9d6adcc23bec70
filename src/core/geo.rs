//! Coordinates, the geographic/native projection pair and XYZ tile math.
//!
//! Internal state is always kept in the native (Web Mercator, meters) system;
//! geographic lon/lat only appears at API boundaries.

use crate::core::constants::{EARTH_RADIUS, HALF_WORLD, MAX_LATITUDE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Coordinate reference system a value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326).
    Geographic,
    /// Spherical Web Mercator in meters (EPSG:3857).
    Native,
}

impl Crs {
    pub fn code(&self) -> &'static str {
        match self {
            Crs::Geographic => "EPSG:4326",
            Crs::Native => "EPSG:3857",
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A position in either coordinate system. Geographic values use x = lon, y = lat.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Rotates around `origin` by `angle` radians, counter-clockwise.
    pub fn rotate_around(&self, origin: &Coordinate, angle: f64) -> Coordinate {
        if angle == 0.0 {
            return *self;
        }
        let (sin, cos) = angle.sin_cos();
        let dx = self.x - origin.x;
        let dy = self.y - origin.y;
        Coordinate::new(
            origin.x + dx * cos - dy * sin,
            origin.y + dx * sin + dy * cos,
        )
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Coordinate> for geo_types::Coord<f64> {
    fn from(c: Coordinate) -> Self {
        geo_types::coord! { x: c.x, y: c.y }
    }
}

impl From<geo_types::Coord<f64>> for Coordinate {
    fn from(c: geo_types::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

/// A viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A surface with no area cannot show anything and is treated as unknown.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A position on the display surface, origin top-left, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Projects lon/lat degrees to Web Mercator meters. Latitude is clamped to the
/// projection's valid band.
pub fn to_native(lon_lat: Coordinate) -> Coordinate {
    let lat = lon_lat.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon_lat.x.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    Coordinate::new(x, y)
}

/// Inverse of [`to_native`].
pub fn to_geographic(native: Coordinate) -> Coordinate {
    let lon = (native.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (native.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    Coordinate::new(lon, lat)
}

/// Converts `coord` from `from` to `to`. Identity when both systems match.
pub fn transform(coord: Coordinate, from: Crs, to: Crs) -> Coordinate {
    match (from, to) {
        (Crs::Geographic, Crs::Native) => to_native(coord),
        (Crs::Native, Crs::Geographic) => to_geographic(coord),
        _ => coord,
    }
}

/// An XYZ tile address, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Edge length of a tile at this zoom in native units.
    pub fn span(z: u8) -> f64 {
        2.0 * HALF_WORLD / f64::from(1u32 << z)
    }

    /// Native bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn native_bounds(&self) -> (f64, f64, f64, f64) {
        let span = Self::span(self.z);
        let min_x = -HALF_WORLD + f64::from(self.x) * span;
        let max_y = HALF_WORLD - f64::from(self.y) * span;
        (min_x, max_y - span, min_x + span, max_y)
    }

    /// Geographic bounds as `(west, south, east, north)` in degrees.
    pub fn geographic_bounds(&self) -> (f64, f64, f64, f64) {
        let (min_x, min_y, max_x, max_y) = self.native_bounds();
        let sw = to_geographic(Coordinate::new(min_x, min_y));
        let ne = to_geographic(Coordinate::new(max_x, max_y));
        (sw.x, sw.y, ne.x, ne.y)
    }

    /// All tiles at zoom `z` intersecting the native rectangle.
    pub fn covering(min_x: f64, min_y: f64, max_x: f64, max_y: f64, z: u8) -> Vec<TileCoord> {
        let n = 1u32 << z;
        let span = Self::span(z);
        let last = f64::from(n - 1);
        let column = |x: f64| ((x + HALF_WORLD) / span).floor().clamp(0.0, last) as u32;
        let row = |y: f64| ((HALF_WORLD - y) / span).floor().clamp(0.0, last) as u32;

        // A max edge sitting exactly on a tile boundary does not reach into the next tile.
        let end_column = |x: f64| {
            let raw = (x + HALF_WORLD) / span;
            let col = if raw.fract() == 0.0 { raw - 1.0 } else { raw.floor() };
            col.clamp(0.0, last) as u32
        };
        let end_row = |y: f64| {
            let raw = (HALF_WORLD - y) / span;
            let r = if raw.fract() == 0.0 { raw - 1.0 } else { raw.floor() };
            r.clamp(0.0, last) as u32
        };

        let (x0, x1) = (column(min_x), end_column(max_x).max(column(min_x)));
        let (y0, y1) = (row(max_y), end_row(min_y).max(row(max_y)));

        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                tiles.push(TileCoord::new(x, y, z));
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() < eps, "{} != {} (eps {})", a, b, eps);
    }

    #[test]
    fn test_round_trip_geographic_native() {
        let samples = [
            (-122.6765, 45.5231),
            (0.0, 0.0),
            (179.9, -84.0),
            (-45.25, 12.5),
        ];
        for (lon, lat) in samples {
            let native = to_native(Coordinate::new(lon, lat));
            let back = to_geographic(native);
            assert_close(back.x, lon, 1e-9);
            assert_close(back.y, lat, 1e-9);
        }
    }

    #[test]
    fn test_known_projection_values() {
        let native = to_native(Coordinate::new(180.0, 0.0));
        assert_close(native.x, HALF_WORLD, 1e-6);
        assert_close(native.y, 0.0, 1e-6);
    }

    #[test]
    fn test_transform_identity() {
        let c = Coordinate::new(12.0, 34.0);
        assert_eq!(transform(c, Crs::Native, Crs::Native), c);
        assert_eq!(transform(c, Crs::Geographic, Crs::Geographic), c);
    }

    #[test]
    fn test_tile_bounds_zoom_zero_is_world() {
        let (w, s, e, n) = TileCoord::new(0, 0, 0).geographic_bounds();
        assert_close(w, -180.0, 1e-9);
        assert_close(e, 180.0, 1e-9);
        assert_close(n, MAX_LATITUDE, 1e-6);
        assert_close(s, -MAX_LATITUDE, 1e-6);
    }

    #[test]
    fn test_tiles_covering_quadrant() {
        // The north-east quadrant of the world at zoom 1 is tile (1, 0).
        let tiles = TileCoord::covering(1.0, 1.0, HALF_WORLD, HALF_WORLD, 1);
        assert_eq!(tiles, vec![TileCoord::new(1, 0, 1)]);

        let all = TileCoord::covering(-HALF_WORLD, -HALF_WORLD, HALF_WORLD, HALF_WORLD, 1);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_rotate_around() {
        let p = Coordinate::new(1.0, 0.0).rotate_around(&Coordinate::default(), PI / 2.0);
        assert_close(p.x, 0.0, 1e-12);
        assert_close(p.y, 1.0, 1e-12);
    }
}
