use crate::error::{MeshError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::PartId;

/// Shape variant of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelShape {
    Triangle,
    Quad,
}

impl PanelShape {
    /// Number of vertices of the shape.
    #[must_use]
    pub fn vertex_count(self) -> usize {
        match self {
            Self::Triangle => 3,
            Self::Quad => 4,
        }
    }
}

/// Where a panel sits on its part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionTag {
    Top,
    Bottom,
    /// Mean surface of a thin lifting surface.
    Mid,
    /// Tip closure of a thick wing.
    Side,
    Fuselage,
    Wake,
}

impl PositionTag {
    /// Thin surfaces carry a doublet sheet only and use a Neumann condition.
    #[must_use]
    pub fn is_thin(self) -> bool {
        matches!(self, Self::Mid | Self::Wake)
    }
}

/// Neighbour slot of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborSlot {
    Upstream,
    Downstream,
    Left,
    Right,
}

impl NeighborSlot {
    pub const ALL: [Self; 4] = [Self::Upstream, Self::Downstream, Self::Left, Self::Right];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Upstream => 0,
            Self::Downstream => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Upstream => Self::Downstream,
            Self::Downstream => Self::Upstream,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Vortex ring attached to a thin quad, shifted a quarter chord downstream of
/// the panel edges. Corners follow the panel's node order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VortexRing {
    pub corners: [Point3; 4],
}

impl VortexRing {
    /// Vector area of the ring.
    #[must_use]
    pub fn vector_area(&self) -> Vector3 {
        let c = &self.corners;
        (c[2] - c[0]).cross(&(c[3] - c[1])) * 0.5
    }

    #[must_use]
    pub fn center(&self) -> Point3 {
        let c = &self.corners;
        Point3::from((c[0].coords + c[1].coords + c[2].coords + c[3].coords) * 0.25)
    }
}

/// A flat triangular or quadrilateral panel.
///
/// Vertices are indices into the owning mesh's node array, never positions,
/// so panels can be shared across threads by reference during assembly.
#[derive(Debug, Clone)]
pub struct Panel {
    pub shape: PanelShape,
    nodes: [usize; 4],
    pub normal: Vector3,
    pub area: f64,
    pub centroid: Point3,
    /// Point at which the boundary condition is enforced.
    pub collocation: Point3,
    /// Largest vertex-to-vertex distance.
    pub max_size: f64,
    pub position: PositionTag,
    pub part: Option<PartId>,
    /// Neighbour panels indexed by [`NeighborSlot::index`].
    pub neighbors: [Option<usize>; 4],
    /// Slot reached through each local edge `k -> k+1`.
    pub edge_slots: [NeighborSlot; 4],
    /// Local index of the edge lying on a trailing edge, if any.
    pub trailing_edge: Option<usize>,
    pub strip: Option<usize>,
    pub ring: Option<VortexRing>,
}

impl Panel {
    /// Builds a panel from node indices and computes its geometry.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] if the panel has zero area, or
    /// [`MeshError::IndexOutOfRange`] if a node index is outside `nodes`.
    pub fn new(
        shape: PanelShape,
        indices: &[usize],
        nodes: &[Point3],
        position: PositionTag,
    ) -> Result<Self> {
        let count = shape.vertex_count();
        if indices.len() != count {
            return Err(MeshError::Degenerate(format!(
                "{count} vertices expected, got {}",
                indices.len()
            ))
            .into());
        }
        let mut stored = [0usize; 4];
        for (slot, &index) in stored.iter_mut().zip(indices) {
            if index >= nodes.len() {
                return Err(MeshError::IndexOutOfRange {
                    what: "node array",
                    index,
                    len: nodes.len(),
                }
                .into());
            }
            *slot = index;
        }
        let mut panel = Self {
            shape,
            nodes: stored,
            normal: Vector3::zeros(),
            area: 0.0,
            centroid: Point3::origin(),
            collocation: Point3::origin(),
            max_size: 0.0,
            position,
            part: None,
            neighbors: [None; 4],
            edge_slots: NeighborSlot::ALL,
            trailing_edge: None,
            strip: None,
            ring: None,
        };
        panel.update_geometry(nodes)?;
        Ok(panel)
    }

    /// Node indices of the panel, in counter-clockwise order about the normal.
    #[must_use]
    pub fn node_indices(&self) -> &[usize] {
        &self.nodes[..self.shape.vertex_count()]
    }

    /// Vertex positions of the panel.
    #[must_use]
    pub fn vertices(&self, nodes: &[Point3]) -> Vec<Point3> {
        self.node_indices().iter().map(|&i| nodes[i]).collect()
    }

    /// Global node indices of local edge `k`.
    #[must_use]
    pub fn edge(&self, k: usize) -> (usize, usize) {
        let n = self.shape.vertex_count();
        (self.nodes[k % n], self.nodes[(k + 1) % n])
    }

    #[must_use]
    pub fn neighbor(&self, slot: NeighborSlot) -> Option<usize> {
        self.neighbors[slot.index()]
    }

    #[must_use]
    pub fn is_thin(&self) -> bool {
        self.position.is_thin()
    }

    #[must_use]
    pub fn is_trailing(&self) -> bool {
        self.trailing_edge.is_some()
    }

    /// Bound vortex segment `(start, end)` on the upstream edge, traversed
    /// against the node order as the doublet-equivalent ring is. Uses the
    /// attached ring when present.
    #[must_use]
    pub fn front_segment(&self, nodes: &[Point3]) -> Option<(Point3, Point3)> {
        let n = self.shape.vertex_count();
        let k = self.edge_slots[..n].iter().position(|&s| s == NeighborSlot::Upstream)?;
        let corners = match &self.ring {
            Some(ring) => ring.corners.to_vec(),
            None => self.vertices(nodes),
        };
        Some((corners[(k + 1) % n], corners[k]))
    }

    /// Recomputes normal, area, centroid and size from node positions. The
    /// collocation point is reset to the centroid unless a ring is attached.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Degenerate`] if the panel area vanishes.
    pub fn update_geometry(&mut self, nodes: &[Point3]) -> Result<()> {
        let v = self.vertices(nodes);
        let (normal, area, centroid) = match self.shape {
            PanelShape::Triangle => {
                let cross = (v[1] - v[0]).cross(&(v[2] - v[0]));
                let centroid = Point3::from((v[0].coords + v[1].coords + v[2].coords) / 3.0);
                (cross, cross.norm() * 0.5, centroid)
            }
            PanelShape::Quad => {
                let cross = (v[2] - v[0]).cross(&(v[3] - v[1]));
                let a1 = (v[1] - v[0]).cross(&(v[2] - v[0])).norm() * 0.5;
                let a2 = (v[2] - v[0]).cross(&(v[3] - v[0])).norm() * 0.5;
                let c1 = (v[0].coords + v[1].coords + v[2].coords) / 3.0;
                let c2 = (v[0].coords + v[2].coords + v[3].coords) / 3.0;
                let centroid = if a1 + a2 > TOLERANCE {
                    Point3::from((c1 * a1 + c2 * a2) / (a1 + a2))
                } else {
                    Point3::from(c1)
                };
                (cross, cross.norm() * 0.5, centroid)
            }
        };
        let len = normal.norm();
        if area < TOLERANCE || len < TOLERANCE {
            return Err(MeshError::Degenerate("panel has zero area".into()).into());
        }

        let mut max_size: f64 = 0.0;
        for (i, a) in v.iter().enumerate() {
            for b in &v[i + 1..] {
                max_size = max_size.max((b - a).norm());
            }
        }

        self.normal = normal / len;
        self.area = area;
        self.centroid = centroid;
        self.max_size = max_size;
        if self.ring.is_none() {
            self.collocation = centroid;
        }
        Ok(())
    }

    /// Local orthonormal frame `(l, m, n)` with `l` along the first edge.
    #[must_use]
    pub fn frame(&self, nodes: &[Point3]) -> (Vector3, Vector3, Vector3) {
        let (a, b) = self.edge(0);
        let edge = nodes[b] - nodes[a];
        let mut l = edge - self.normal * edge.dot(&self.normal);
        if l.norm() < TOLERANCE {
            l = self.normal.cross(&Vector3::x());
            if l.norm() < TOLERANCE {
                l = self.normal.cross(&Vector3::y());
            }
        }
        let l = l.normalize();
        let m = self.normal.cross(&l);
        (l, m, self.normal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ]
    }

    #[test]
    fn quad_geometry() {
        let nodes = square();
        let panel = Panel::new(PanelShape::Quad, &[0, 1, 2, 3], &nodes, PositionTag::Top).unwrap();
        assert_relative_eq!(panel.area, 4.0, epsilon = 1e-12);
        assert_relative_eq!(panel.normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(panel.centroid, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(panel.max_size, 8.0_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(panel.node_indices().len(), 4);
    }

    #[test]
    fn clockwise_triangle_points_down() {
        let nodes = square();
        let panel =
            Panel::new(PanelShape::Triangle, &[0, 2, 1], &nodes, PositionTag::Bottom).unwrap();
        assert_relative_eq!(panel.normal, -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(panel.area, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_panel_is_degenerate() {
        let nodes = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let result = Panel::new(PanelShape::Triangle, &[0, 1, 2], &nodes, PositionTag::Mid);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_node_is_rejected() {
        let nodes = square();
        let result = Panel::new(PanelShape::Triangle, &[0, 1, 7], &nodes, PositionTag::Mid);
        assert!(result.is_err());
    }

    #[test]
    fn frame_is_orthonormal() {
        let nodes = square();
        let panel = Panel::new(PanelShape::Quad, &[0, 1, 2, 3], &nodes, PositionTag::Top).unwrap();
        let (l, m, n) = panel.frame(&nodes);
        assert_relative_eq!(l.dot(&m), 0.0, epsilon = 1e-12);
        assert_relative_eq!(l.cross(&m), n, epsilon = 1e-12);
    }

    #[test]
    fn front_segment_runs_against_node_order() {
        let nodes = square();
        let mut panel = Panel::new(PanelShape::Quad, &[0, 1, 2, 3], &nodes, PositionTag::Mid).unwrap();
        panel.edge_slots = [
            NeighborSlot::Left,
            NeighborSlot::Downstream,
            NeighborSlot::Right,
            NeighborSlot::Upstream,
        ];
        let (a, b) = panel.front_segment(&nodes).unwrap();
        assert_eq!(a, nodes[0]);
        assert_eq!(b, nodes[3]);
    }

    #[test]
    fn slot_opposites() {
        for slot in NeighborSlot::ALL {
            assert_eq!(slot.opposite().opposite(), slot);
            assert_eq!(NeighborSlot::ALL[slot.index()], slot);
        }
    }
}
