use crate::core::extent::Extent;
use crate::core::geo::Coordinate;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A spatial item that can be indexed via an R-tree
#[derive(Debug, Clone)]
pub struct SpatialItem<T> {
    pub id: String,
    pub bounds: Extent,
    pub data: T,
}

impl<T> SpatialItem<T> {
    pub fn new(id: String, bounds: Extent, data: T) -> Self {
        Self { id, bounds, data }
    }
}

impl<T> PartialEq for SpatialItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SpatialItem<T> {}

// --- rstar integration -------------------------------------------------------------------------

impl<T> RTreeObject for SpatialItem<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_x(), self.bounds.min_y()],
            [self.bounds.max_x(), self.bounds.max_y()],
        )
    }
}

impl<T> PointDistance for SpatialItem<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope().distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.bounds
            .contains_coordinate(&Coordinate::new(point[0], point[1]))
    }
}

/// R-tree over item envelopes in a single coordinate system.
pub struct SpatialIndex<T> {
    rtree: RTree<SpatialItem<T>>,
}

impl<T: Clone> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            rtree: RTree::new(),
        }
    }

    pub fn insert(&mut self, item: SpatialItem<T>) {
        self.rtree.insert(item);
    }

    /// Items whose envelope lies within `radius` of `center`.
    pub fn query_radius(&self, center: &Coordinate, radius: f64) -> Vec<&SpatialItem<T>> {
        self.rtree
            .locate_within_distance([center.x, center.y], radius * radius)
            .collect()
    }

    pub fn remove(&mut self, id: &str) -> Option<SpatialItem<T>> {
        // First find the element immutably, clone it, then remove mutably.
        let found = self.rtree.iter().find(|obj| obj.id == id).cloned()?;
        self.rtree.remove(&found)
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn clear(&mut self) {
        self.rtree = RTree::new();
    }
}

impl<T: Clone> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, x: f64, y: f64) -> SpatialItem<u32> {
        SpatialItem::new(id.to_string(), Extent::native(x, y, x, y).unwrap(), 0)
    }

    #[test]
    fn test_query_radius() {
        let mut index = SpatialIndex::new();
        index.insert(item("a", 0.0, 0.0));
        index.insert(item("b", 10.0, 0.0));
        let hits = index.query_radius(&Coordinate::new(1.0, 0.0), 2.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn test_remove() {
        let mut index = SpatialIndex::new();
        index.insert(item("a", 0.0, 0.0));
        assert!(index.remove("a").is_some());
        assert!(index.remove("a").is_none());
        assert!(index.is_empty());
    }
}
