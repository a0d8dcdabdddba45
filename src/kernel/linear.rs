use std::collections::{HashMap, HashSet};

use crate::error::{KernelError, Result};
use crate::math::{Point3, FOUR_PI};
use crate::mesh::{PanelMesh, PanelShape, Panel, PositionTag};

use super::{triangle_solid_angle, KernelParams};

/// Self-influence of each linear basis function at the panel centroid.
const SELF_BASIS: f64 = -1.0 / 6.0;

/// Doublet potential at `point` of the three linear basis functions of a
/// triangular panel, one per vertex in node order.
///
/// Nearby panels are split into `m²` sub-triangles, each contributing its
/// solid angle weighted by the basis values at its centroid. Distant panels
/// use a three-point Gauss rule of point doublets.
#[must_use]
pub fn basis_potentials(
    panel: &Panel,
    nodes: &[Point3],
    point: &Point3,
    is_self: bool,
    params: &KernelParams,
) -> [f64; 3] {
    if is_self {
        return [SELF_BASIS; 3];
    }
    let v = panel.vertices(nodes);
    let distance = (point - panel.centroid).norm();
    if distance > params.far_field_factor * panel.max_size {
        return gauss_potentials(panel, &v, point);
    }
    let depth = if distance < 2.0 * panel.max_size { 3 } else { 2 };
    subdivided_potentials(&v, point, depth)
}

fn subdivided_potentials(v: &[Point3], point: &Point3, depth: u32) -> [f64; 3] {
    let m = 1usize << depth;
    #[allow(clippy::cast_precision_loss)]
    let inv = 1.0 / m as f64;
    let at = |s: f64, t: f64| v[0] + (v[1] - v[0]) * s + (v[2] - v[0]) * t;
    let mut out = [0.0; 3];
    let mut add = |a: (f64, f64), b: (f64, f64), c: (f64, f64)| {
        let omega = triangle_solid_angle(&at(a.0, a.1), &at(b.0, b.1), &at(c.0, c.1), point);
        let s = (a.0 + b.0 + c.0) / 3.0;
        let t = (a.1 + b.1 + c.1) / 3.0;
        let weight = omega / FOUR_PI;
        out[0] += weight * (1.0 - s - t);
        out[1] += weight * s;
        out[2] += weight * t;
    };
    for i in 0..m {
        for j in 0..m - i {
            #[allow(clippy::cast_precision_loss)]
            let (s, t) = (i as f64 * inv, j as f64 * inv);
            add((s, t), (s + inv, t), (s, t + inv));
            if i + j + 1 < m {
                add((s + inv, t), (s + inv, t + inv), (s, t + inv));
            }
        }
    }
    out
}

fn gauss_potentials(panel: &Panel, v: &[Point3], point: &Point3) -> [f64; 3] {
    let mut out = [0.0; 3];
    for g in 0..3 {
        let weights = [
            if g == 0 { 2.0 / 3.0 } else { 1.0 / 6.0 },
            if g == 1 { 2.0 / 3.0 } else { 1.0 / 6.0 },
            if g == 2 { 2.0 / 3.0 } else { 1.0 / 6.0 },
        ];
        let q = Point3::from(v[0].coords * weights[0] + v[1].coords * weights[1] + v[2].coords * weights[2]);
        let r = point - q;
        let d = r.norm();
        let phi = panel.area * panel.normal.dot(&r) / (FOUR_PI * d * d * d) / 3.0;
        for (o, w) in out.iter_mut().zip(weights) {
            *o += phi * w;
        }
    }
    out
}

/// Node strengths of a linear-density mesh as averages of panel unknowns.
///
/// Trailing-edge nodes are averaged separately over bottom panels and over
/// the remaining panels, so the doublet jump at the trailing edge survives.
#[derive(Debug, Clone)]
pub struct NodeAverage {
    contributors: Vec<[Vec<usize>; 3]>,
}

impl NodeAverage {
    /// # Errors
    ///
    /// Returns [`KernelError::LinearOnQuad`] for the first quad panel.
    pub fn new(mesh: &PanelMesh) -> Result<Self> {
        let panels = mesh.panels();
        if let Some(q) = panels.iter().position(|p| p.shape == PanelShape::Quad) {
            return Err(KernelError::LinearOnQuad(q).into());
        }
        let trailing: HashSet<usize> = panels
            .iter()
            .filter_map(|p| p.trailing_edge.map(|k| p.edge(k)))
            .flat_map(|(a, b)| [a, b])
            .collect();
        let group = |panel: &Panel, node: usize| {
            (node, trailing.contains(&node) && panel.position == PositionTag::Bottom)
        };

        let mut sharing: HashMap<(usize, bool), Vec<usize>> = HashMap::new();
        for (p, panel) in panels.iter().enumerate() {
            for &node in panel.node_indices() {
                sharing.entry(group(panel, node)).or_default().push(p);
            }
        }
        let contributors = panels
            .iter()
            .map(|panel| {
                let n = panel.node_indices();
                [0, 1, 2].map(|a| sharing.get(&group(panel, n[a])).cloned().unwrap_or_default())
            })
            .collect();
        Ok(Self { contributors })
    }

    /// Panels averaged into local vertex `local` of `panel`.
    #[must_use]
    pub fn contributors(&self, panel: usize, local: usize) -> &[usize] {
        &self.contributors[panel][local]
    }

    /// Averaged strength at local vertex `local` of `panel`.
    #[must_use]
    pub fn node_value(&self, panel: usize, local: usize, strengths: &[f64]) -> f64 {
        let c = self.contributors(panel, local);
        if c.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = c.len() as f64;
        c.iter().map(|&j| strengths[j]).sum::<f64>() / count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kernel::doublet_potential;
    use crate::mesh::{BuildPanelMesh, PanelShapePolicy, Part, PartKind, PartStore, SurfaceKind, WingShape};
    use approx::assert_relative_eq;

    fn triangle() -> (Vec<Point3>, Panel) {
        let nodes = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.2, 0.9, 0.0),
        ];
        let panel = Panel::new(PanelShape::Triangle, &[0, 1, 2], &nodes, PositionTag::Top).unwrap();
        (nodes, panel)
    }

    #[test]
    fn basis_sum_equals_uniform_potential() {
        let (nodes, panel) = triangle();
        let params = KernelParams::default();
        for p in [
            Point3::new(0.3, 0.3, 0.05),
            Point3::new(1.5, -0.4, 0.7),
            Point3::new(4.0, 2.0, -3.0),
        ] {
            let basis = basis_potentials(&panel, &nodes, &p, false, &params);
            let uniform = doublet_potential(&panel, &nodes, &p, false, &params);
            assert_relative_eq!(basis.iter().sum::<f64>(), uniform, epsilon = 1e-12);
        }
    }

    #[test]
    fn self_basis_is_one_sixth() {
        let (nodes, panel) = triangle();
        let basis = basis_potentials(&panel, &nodes, &panel.centroid, true, &KernelParams::default());
        assert_eq!(basis, [SELF_BASIS; 3]);
    }

    #[test]
    fn basis_favours_nearest_vertex() {
        let (nodes, panel) = triangle();
        let p = Point3::new(0.95, 0.02, 0.01);
        let basis = basis_potentials(&panel, &nodes, &p, false, &KernelParams::default());
        assert!(basis[1] > basis[0]);
        assert!(basis[1] > basis[2]);
    }

    #[test]
    fn gauss_far_field_is_close_to_subdivision() {
        let (nodes, panel) = triangle();
        let p = Point3::new(6.0, 3.0, 5.0);
        let exact = subdivided_potentials(&panel.vertices(&nodes), &p, 3);
        let far = gauss_potentials(&panel, &panel.vertices(&nodes), &p);
        for (a, b) in exact.iter().zip(far) {
            assert_relative_eq!(*a, b, max_relative = 1e-2);
        }
    }

    #[test]
    fn rejects_quads() {
        let mut store = PartStore::new();
        store.insert(Part::new(
            "plate",
            PartKind::Wing,
            SurfaceKind::Thin,
            vec![crate::mesh::SurfaceGrid::flat_plate(1.0, 2.0, 2, 2)],
        ));
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        assert!(matches!(
            NodeAverage::new(&mesh),
            Err(crate::PanelflowError::Kernel(KernelError::LinearOnQuad(0)))
        ));
    }

    #[test]
    fn trailing_nodes_split_top_and_bottom() {
        let shape = WingShape {
            chord_panels: 4,
            span_panels: 2,
            ..WingShape::default()
        };
        let mut store = PartStore::new();
        store.insert(Part::new("wing", PartKind::Wing, SurfaceKind::Thick, shape.thick_surfaces().unwrap()));
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Triangles).execute().unwrap();
        let average = NodeAverage::new(&mesh).unwrap();
        for (p, panel) in mesh.panels().iter().enumerate() {
            let Some(k) = panel.trailing_edge else { continue };
            let (a, _) = panel.edge(k);
            let local = panel.node_indices().iter().position(|&n| n == a).unwrap();
            let bottom = panel.position == PositionTag::Bottom;
            for &j in average.contributors(p, local) {
                assert_eq!(mesh.panel(j).position == PositionTag::Bottom, bottom);
            }
        }
    }
}
