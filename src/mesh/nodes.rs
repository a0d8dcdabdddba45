use std::collections::HashMap;

use crate::math::Point3;

/// Default positional tolerance used to merge coincident nodes, in metres.
pub const NODE_TOLERANCE: f64 = 1e-6;

/// Node array with tolerance-based deduplication.
///
/// Points are bucketed on a grid whose cell size equals the tolerance, so a
/// lookup only inspects the 27 cells around the candidate.
#[derive(Debug, Clone)]
pub struct NodeArray {
    points: Vec<Point3>,
    buckets: HashMap<CellKey, Vec<usize>>,
    tolerance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    x: i64,
    y: i64,
    z: i64,
}

impl NodeArray {
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            points: Vec::new(),
            buckets: HashMap::new(),
            tolerance: tolerance.max(f64::EPSILON),
        }
    }

    /// Returns the index of a node within tolerance of `point`, inserting a
    /// new node if none exists.
    pub fn insert(&mut self, point: Point3) -> usize {
        if let Some(existing) = self.find(&point) {
            return existing;
        }
        let index = self.points.len();
        self.points.push(point);
        self.buckets.entry(self.key(&point)).or_default().push(index);
        index
    }

    /// Index of the closest node within tolerance of `point`.
    #[must_use]
    pub fn find(&self, point: &Point3) -> Option<usize> {
        let key = self.key(point);
        let mut best: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let cell = CellKey {
                        x: key.x + dx,
                        y: key.y + dy,
                        z: key.z + dz,
                    };
                    let Some(bucket) = self.buckets.get(&cell) else {
                        continue;
                    };
                    for &index in bucket {
                        let d = (self.points[index] - point).norm();
                        if d <= self.tolerance && best.is_none_or(|(_, bd)| d < bd) {
                            best = Some((index, d));
                        }
                    }
                }
            }
        }
        best.map(|(index, _)| index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn into_points(self) -> Vec<Point3> {
        self.points
    }

    #[allow(clippy::cast_possible_truncation)]
    fn key(&self, p: &Point3) -> CellKey {
        let inv = 1.0 / self.tolerance;
        CellKey {
            x: (p.x * inv).floor() as i64,
            y: (p.y * inv).floor() as i64,
            z: (p.z * inv).floor() as i64,
        }
    }
}

impl Default for NodeArray {
    fn default() -> Self {
        Self::new(NODE_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coincident_points_share_a_node() {
        let mut nodes = NodeArray::new(1e-6);
        let a = nodes.insert(Point3::new(1.0, 2.0, 3.0));
        let b = nodes.insert(Point3::new(1.0 + 4e-7, 2.0, 3.0 - 2e-7));
        assert_eq!(a, b);
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn separate_points_stay_separate() {
        let mut nodes = NodeArray::new(1e-6);
        let a = nodes.insert(Point3::new(0.0, 0.0, 0.0));
        let b = nodes.insert(Point3::new(1e-5, 0.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn points_across_cell_boundary_merge() {
        let mut nodes = NodeArray::new(1e-3);
        let a = nodes.insert(Point3::new(0.999_9e-3, 0.0, 0.0));
        let b = nodes.insert(Point3::new(1.000_1e-3, 0.0, 0.0));
        assert_eq!(a, b);
    }

    #[test]
    fn no_two_nodes_within_tolerance() {
        let mut nodes = NodeArray::new(1e-4);
        for i in 0..200 {
            let t = f64::from(i) * 0.37;
            nodes.insert(Point3::new(t.sin(), t.cos(), (t * 0.5).sin()));
            nodes.insert(Point3::new(t.sin() + 1e-5, t.cos(), (t * 0.5).sin()));
        }
        let pts = nodes.points();
        for i in 0..pts.len() {
            for j in i + 1..pts.len() {
                assert!((pts[i] - pts[j]).norm() > 1e-4);
            }
        }
    }
}
