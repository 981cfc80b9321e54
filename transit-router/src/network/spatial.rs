//! Spatial lookup of stops by coordinate.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::domain::Coord;

use super::index::StopIndex;

/// A stop position stored in the R-tree.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StopPoint {
    index: StopIndex,
    position: [f64; 2],
}

impl RTreeObject for StopPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for StopPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// R-tree over stop coordinates.
#[derive(Debug)]
pub struct StopLocator {
    tree: RTree<StopPoint>,
}

impl StopLocator {
    /// Bulk-load a locator from `(index, coordinate)` pairs.
    pub fn new(stops: impl IntoIterator<Item = (StopIndex, Coord)>) -> Self {
        let points = stops
            .into_iter()
            .map(|(index, coord)| StopPoint {
                index,
                position: coord.as_array(),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(points),
        }
    }

    /// Stops within `radius` of `coord` (inclusive), sorted by stop index.
    pub fn within(&self, coord: &Coord, radius: f64) -> Vec<StopIndex> {
        if !(radius >= 0.0) {
            return Vec::new();
        }
        let mut found: Vec<StopIndex> = self
            .tree
            .locate_within_distance(coord.as_array(), radius * radius)
            .map(|p| p.index)
            .collect();
        found.sort_unstable();
        found
    }

    /// The nearest stop and its distance.
    ///
    /// Ties are broken towards the lower stop index.
    pub fn nearest(&self, coord: &Coord) -> Option<(StopIndex, f64)> {
        let point = coord.as_array();
        let nearest = self.tree.nearest_neighbor(&point)?;
        let distance_2 = nearest.distance_2(&point);
        // Equidistant stops are returned in unspecified order by the tree.
        let index = self
            .tree
            .locate_within_distance(point, distance_2)
            .filter(|p| p.distance_2(&point) <= distance_2)
            .map(|p| p.index)
            .min()
            .unwrap_or(nearest.index);
        Some((index, distance_2.sqrt()))
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
