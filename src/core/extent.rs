use crate::core::geo::{transform, Coordinate, Crs, TileCoord};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle tagged with the coordinate system it is expressed in.
///
/// `min_x <= max_x` and `min_y <= max_y` always hold; the constructor rejects
/// anything else.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    crs: Crs,
}

impl Extent {
    /// Creates an extent, failing when the corners are inverted or not finite.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: Crs) -> Result<Self> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x > max_x || min_y > max_y {
            return Err(MapError::InvalidExtent(format!(
                "({}, {}, {}, {}) in {}",
                min_x, min_y, max_x, max_y, crs
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs,
        })
    }

    pub fn native(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        Self::new(min_x, min_y, max_x, max_y, Crs::Native)
    }

    pub fn geographic(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        Self::new(west, south, east, north, Crs::Geographic)
    }

    /// Smallest extent containing every point; `None` for an empty iterator.
    pub fn from_points<I>(points: I, crs: Crs) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut extent = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
            crs,
        };
        for p in iter {
            extent.extend(&p);
        }
        Some(extent)
    }

    /// Native bounds of an XYZ tile.
    pub fn from_tile(tile: &TileCoord) -> Self {
        let (min_x, min_y, max_x, max_y) = tile.native_bounds();
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs: Crs::Native,
        }
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn corners(&self) -> [Coordinate; 4] {
        [
            Coordinate::new(self.min_x, self.min_y),
            Coordinate::new(self.max_x, self.min_y),
            Coordinate::new(self.max_x, self.max_y),
            Coordinate::new(self.min_x, self.max_y),
        ]
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn contains_coordinate(&self, point: &Coordinate) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// True when `other` lies entirely inside. Extents in different systems never contain each other.
    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.crs == other.crs
            && other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.crs == other.crs
            && !(other.max_x < self.min_x
                || other.min_x > self.max_x
                || other.max_y < self.min_y
                || other.min_y > self.max_y)
    }

    /// Extends the extent to include a point.
    pub fn extend(&mut self, point: &Coordinate) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Returns a copy grown by `amount` on every side.
    pub fn buffered(&self, amount: f64) -> Extent {
        let amount = amount.max(-(self.width().min(self.height())) / 2.0);
        Extent {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
            crs: self.crs,
        }
    }

    /// Re-expresses the extent in `crs`, transforming the corners.
    pub fn to_crs(&self, crs: Crs) -> Extent {
        if crs == self.crs {
            return *self;
        }
        let min = transform(Coordinate::new(self.min_x, self.min_y), self.crs, crs);
        let max = transform(Coordinate::new(self.max_x, self.max_y), self.crs, crs);
        Extent {
            min_x: min.x.min(max.x),
            min_y: min.y.min(max.y),
            max_x: min.x.max(max.x),
            max_y: min.y.max(max.y),
            crs,
        }
    }

    /// `minX,minY,maxX,maxY` as used by bounding-box queries.
    pub fn to_bbox_param(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_corners() {
        assert!(matches!(
            Extent::native(10.0, 0.0, 0.0, 10.0),
            Err(MapError::InvalidExtent(_))
        ));
        assert!(Extent::native(0.0, 0.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_contains() {
        let outer = Extent::native(0.0, 0.0, 100.0, 100.0).unwrap();
        let inner = Extent::native(10.0, 10.0, 20.0, 20.0).unwrap();
        assert!(outer.contains_extent(&inner));
        assert!(!inner.contains_extent(&outer));
        assert!(outer.contains_coordinate(&Coordinate::new(100.0, 0.0)));
    }

    #[test]
    fn test_to_crs_round_trip() {
        let geo = Extent::geographic(-122.8, 45.4, -122.5, 45.6).unwrap();
        let back = geo.to_crs(Crs::Native).to_crs(Crs::Geographic);
        for (a, b) in geo.as_array().iter().zip(back.as_array().iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(back.crs(), Crs::Geographic);
    }

    #[test]
    fn test_bbox_param() {
        let e = Extent::geographic(-1.5, 2.0, 3.0, 4.25).unwrap();
        assert_eq!(e.to_bbox_param(), "-1.5,2,3,4.25");
    }

    #[test]
    fn test_from_points() {
        let e = Extent::from_points(
            vec![Coordinate::new(3.0, -1.0), Coordinate::new(-2.0, 5.0)],
            Crs::Native,
        )
        .unwrap();
        assert_eq!(e.as_array(), [-2.0, -1.0, 3.0, 5.0]);
        assert!(Extent::from_points(Vec::new(), Crs::Native).is_none());
    }
}
