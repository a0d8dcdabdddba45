use std::collections::HashMap;

use crate::error::{MeshError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{NeighborSlot, NodeArray, Panel, PanelMesh, PanelShape, PositionTag, NODE_TOLERANCE};

/// Wake generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeParams {
    /// Number of panels in each wake column.
    pub panels: usize,
    /// Ratio between consecutive step lengths.
    pub growth_factor: f64,
    /// Total wake length, metres.
    pub length: f64,
    /// Stretch columns so that they all end on the same downstream plane.
    pub aligned: bool,
}

impl Default for WakeParams {
    fn default() -> Self {
        Self {
            panels: 5,
            growth_factor: 1.1,
            length: 30.0,
            aligned: false,
        }
    }
}

/// Step lengths of a geometric series of `count` terms with ratio `growth`
/// summing to `total`.
#[must_use]
pub fn geometric_steps(count: usize, growth: f64, total: f64) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let n = i32::try_from(count).unwrap_or(i32::MAX);
    let first = if (growth - 1.0).abs() < 1e-9 {
        total / f64::from(n)
    } else {
        total * (1.0 - growth) / (1.0 - growth.powi(n))
    };
    let mut steps = Vec::with_capacity(count);
    let mut step = first;
    for _ in 0..count {
        steps.push(step);
        step *= growth;
    }
    steps
}

/// Downstream chain of wake nodes shed from one trailing-edge node.
#[derive(Debug, Clone)]
struct Chain {
    nodes: Vec<usize>,
    steps: Vec<f64>,
}

/// Wake panels shed from one trailing panel.
#[derive(Debug, Clone)]
pub struct WakeColumn {
    /// Body panel whose strength enters the wake with a positive sign.
    pub upper: usize,
    /// Bottom panel of a thick trailing edge, entering with a negative sign.
    pub lower: Option<usize>,
    pub strip: Option<usize>,
    /// Wake panel indices, trailing edge first.
    pub panels: Vec<usize>,
    left: usize,
    right: usize,
}

/// Wake panels with their own node array, organised in columns.
///
/// Each column is a singly linked chain through the `Downstream` slot,
/// starting at the trailing edge and ending in a free edge.
#[derive(Debug, Clone)]
pub struct WakeMesh {
    nodes: Vec<Point3>,
    panels: Vec<Panel>,
    columns: Vec<WakeColumn>,
    chains: Vec<Chain>,
    direction: Vector3,
}

impl WakeMesh {
    #[must_use]
    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    #[must_use]
    pub fn columns(&self) -> &[WakeColumn] {
        &self.columns
    }

    #[must_use]
    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    /// Step lengths along a column, taken as the mean of its two edge chains.
    #[must_use]
    pub fn step_lengths(&self, column: usize) -> Vec<f64> {
        let col = &self.columns[column];
        let (left, right) = (&self.chains[col.left].steps, &self.chains[col.right].steps);
        left.iter().zip(right).map(|(a, b)| 0.5 * (a + b)).collect()
    }

    /// Total length of a column.
    #[must_use]
    pub fn column_length(&self, column: usize) -> f64 {
        self.step_lengths(column).iter().sum()
    }

    /// Trailing-edge end points `(left, right)` of a column.
    #[must_use]
    pub fn trailing_points(&self, column: usize) -> (Point3, Point3) {
        let col = &self.columns[column];
        (
            self.nodes[self.chains[col.left].nodes[0]],
            self.nodes[self.chains[col.right].nodes[0]],
        )
    }

    /// Downstream end points `(left, right)` of a column.
    #[must_use]
    pub fn end_points(&self, column: usize) -> (Point3, Point3) {
        let col = &self.columns[column];
        let last = |chain: usize| {
            let nodes = &self.chains[chain].nodes;
            self.nodes[nodes[nodes.len() - 1]]
        };
        (last(col.left), last(col.right))
    }

    /// Node chains as `(node indices, step lengths)`, trailing edge first.
    pub fn chains(&self) -> impl Iterator<Item = (&[usize], &[f64])> {
        self.chains.iter().map(|c| (c.nodes.as_slice(), c.steps.as_slice()))
    }

    /// Replaces node positions and recomputes the panel geometry.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::WakeColumn`] if the node count changes or a panel
    /// degenerates.
    pub fn set_nodes(&mut self, nodes: Vec<Point3>) -> Result<()> {
        if nodes.len() != self.nodes.len() {
            return Err(MeshError::WakeColumn {
                column: 0,
                reason: format!("expected {} nodes, got {}", self.nodes.len(), nodes.len()),
            }
            .into());
        }
        self.nodes = nodes;
        for panel in &mut self.panels {
            panel.update_geometry(&self.nodes)?;
        }
        Ok(())
    }

    /// Verifies that each column is a single unbranched chain of `expected`
    /// panels ending in a free edge, and that no panel is shared.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::WakeColumn`] describing the first violation.
    pub fn check_columns(&self, expected: usize) -> Result<()> {
        let mut owner: Vec<Option<usize>> = vec![None; self.panels.len()];
        for (c, column) in self.columns.iter().enumerate() {
            let fail = |reason: String| -> Result<()> {
                Err(MeshError::WakeColumn { column: c, reason }.into())
            };
            let Some(&first) = column.panels.first() else {
                return fail("column is empty".into());
            };
            if self.panels[first].neighbor(NeighborSlot::Upstream).is_some() {
                return fail("first panel has an upstream neighbour".into());
            }
            let mut current = first;
            let mut walked = Vec::with_capacity(expected);
            loop {
                if let Some(previous) = owner[current] {
                    return fail(format!("panel {current} already belongs to column {previous}"));
                }
                owner[current] = Some(c);
                walked.push(current);
                let Some(next) = self.panels[current].neighbor(NeighborSlot::Downstream) else {
                    break;
                };
                if next >= self.panels.len() {
                    return fail(format!("panel {current} links past the wake"));
                }
                if self.panels[next].neighbor(NeighborSlot::Upstream) != Some(current) {
                    return fail(format!("panel {next} does not link back to {current}"));
                }
                current = next;
            }
            if walked != column.panels {
                return fail("chain does not match the column's panel list".into());
            }
            if walked.len() != expected {
                return fail(format!("{} panels, expected {expected}", walked.len()));
            }
        }
        Ok(())
    }
}

/// Sheds a wake column from every trailing panel on the bottom or mean
/// surface of `mesh`.
pub struct GenerateWake<'a> {
    mesh: &'a PanelMesh,
    params: WakeParams,
    direction: Vector3,
}

impl<'a> GenerateWake<'a> {
    /// Creates a wake generator stepping along the body `x` axis.
    #[must_use]
    pub fn new(mesh: &'a PanelMesh, params: WakeParams) -> Self {
        Self {
            mesh,
            params,
            direction: Vector3::x(),
        }
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Vector3) -> Self {
        self.direction = direction;
        self
    }

    /// Executes the generation.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::WakeColumn`] for invalid parameters or a bottom
    /// trailing panel without a matching top panel, and
    /// [`MeshError::Degenerate`] if a wake panel has zero area.
    pub fn execute(&self) -> Result<WakeMesh> {
        let params = self.params;
        if params.panels == 0 || params.growth_factor <= 0.0 || params.length <= 0.0 {
            return Err(MeshError::WakeColumn {
                column: 0,
                reason: format!(
                    "invalid wake parameters: {} panels, growth {}, length {}",
                    params.panels, params.growth_factor, params.length
                ),
            }
            .into());
        }
        let norm = self.direction.norm();
        if norm < TOLERANCE {
            return Err(MeshError::WakeColumn {
                column: 0,
                reason: "zero wake direction".into(),
            }
            .into());
        }
        let direction = self.direction / norm;
        let body = self.mesh.nodes();
        let panels = self.mesh.panels();

        let mut tops: HashMap<(usize, usize), usize> = HashMap::new();
        for (p, panel) in panels.iter().enumerate() {
            if let (Some(k), PositionTag::Top) = (panel.trailing_edge, panel.position) {
                let (a, b) = panel.edge(k);
                tops.insert((a.min(b), a.max(b)), p);
            }
        }

        // (upper, lower, left node, right node) of every shedding panel.
        let mut sheds = Vec::new();
        for (p, panel) in panels.iter().enumerate() {
            let Some(k) = panel.trailing_edge else {
                continue;
            };
            let (a, b) = panel.edge(k);
            match panel.position {
                PositionTag::Mid => sheds.push((p, None, a, b)),
                PositionTag::Bottom => {
                    let Some(&top) = tops.get(&(a.min(b), a.max(b))) else {
                        return Err(MeshError::WakeColumn {
                            column: sheds.len(),
                            reason: format!("bottom trailing panel {p} has no top partner"),
                        }
                        .into());
                    };
                    sheds.push((top, Some(p), b, a));
                }
                _ => {}
            }
        }

        let downstream_plane = sheds
            .iter()
            .flat_map(|&(_, _, l, r)| [l, r])
            .map(|n| body[n].coords.dot(&direction))
            .fold(f64::MIN, f64::max);

        let mut nodes = NodeArray::new(NODE_TOLERANCE);
        let mut chains: Vec<Chain> = Vec::new();
        let mut chain_of: HashMap<usize, usize> = HashMap::new();
        let mut chain_for = |node: usize, nodes: &mut NodeArray| -> usize {
            *chain_of.entry(node).or_insert_with(|| {
                let origin = body[node];
                let length = if params.aligned {
                    params.length + (downstream_plane - origin.coords.dot(&direction))
                } else {
                    params.length
                };
                let steps = geometric_steps(params.panels, params.growth_factor, length);
                let mut ids = Vec::with_capacity(steps.len() + 1);
                let mut s = 0.0;
                ids.push(nodes.insert(origin));
                for step in &steps {
                    s += step;
                    ids.push(nodes.insert(origin + direction * s));
                }
                chains.push(Chain { nodes: ids, steps });
                chains.len() - 1
            })
        };

        let mut column_chains = Vec::with_capacity(sheds.len());
        for &(_, _, left, right) in &sheds {
            let l = chain_for(left, &mut nodes);
            let r = chain_for(right, &mut nodes);
            column_chains.push((l, r));
        }
        let points = nodes.into_points();

        let mut wake_panels = Vec::with_capacity(sheds.len() * params.panels);
        let mut columns = Vec::with_capacity(sheds.len());
        for (c, (&(upper, lower, _, _), &(l, r))) in sheds.iter().zip(&column_chains).enumerate() {
            let (ln, rn) = (&chains[l].nodes, &chains[r].nodes);
            let first = wake_panels.len();
            let mut ids = Vec::with_capacity(params.panels);
            for k in 0..params.panels {
                let mut panel = Panel::new(
                    PanelShape::Quad,
                    &[ln[k], ln[k + 1], rn[k + 1], rn[k]],
                    &points,
                    PositionTag::Wake,
                )
                .map_err(|_| MeshError::WakeColumn {
                    column: c,
                    reason: format!("wake panel {k} is degenerate"),
                })?;
                panel.edge_slots = [
                    NeighborSlot::Left,
                    NeighborSlot::Downstream,
                    NeighborSlot::Right,
                    NeighborSlot::Upstream,
                ];
                let index = first + k;
                if k > 0 {
                    panel.neighbors[NeighborSlot::Upstream.index()] = Some(index - 1);
                }
                if k + 1 < params.panels {
                    panel.neighbors[NeighborSlot::Downstream.index()] = Some(index + 1);
                }
                panel.part = panels[upper].part;
                panel.strip = panels[upper].strip;
                ids.push(index);
                wake_panels.push(panel);
            }
            columns.push(WakeColumn {
                upper,
                lower,
                strip: panels[upper].strip,
                panels: ids,
                left: l,
                right: r,
            });
        }

        Ok(WakeMesh {
            nodes: points,
            panels: wake_panels,
            columns,
            chains,
            direction,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::{
        BuildPanelMesh, PanelShapePolicy, Part, PartKind, PartStore, SurfaceGrid, SurfaceKind,
        WingShape,
    };
    use approx::assert_relative_eq;

    fn mesh_of(part: Part, policy: PanelShapePolicy) -> PanelMesh {
        let mut store = PartStore::new();
        store.insert(part);
        BuildPanelMesh::new(&store, policy).execute().unwrap()
    }

    fn plate() -> Part {
        Part::new(
            "plate",
            PartKind::Wing,
            SurfaceKind::Thin,
            vec![SurfaceGrid::flat_plate(1.0, 6.0, 3, 6)],
        )
    }

    fn swept(thick: bool) -> Part {
        let shape = WingShape {
            sweep: 25.0,
            chord_panels: 4,
            span_panels: 6,
            ..WingShape::default()
        };
        if thick {
            Part::new("wing", PartKind::Wing, SurfaceKind::Thick, shape.thick_surfaces().unwrap())
        } else {
            Part::new("wing", PartKind::Wing, SurfaceKind::Thin, vec![shape.thin_surface().unwrap()])
        }
    }

    #[test]
    fn geometric_series_sums_to_total() {
        for growth in [0.8, 1.0, 1.1, 1.5] {
            let steps = geometric_steps(7, growth, 12.5);
            assert_eq!(steps.len(), 7);
            assert_relative_eq!(steps.iter().sum::<f64>(), 12.5, epsilon = 1e-10);
            assert_relative_eq!(steps[1] / steps[0], growth, epsilon = 1e-10);
        }
    }

    #[test]
    fn unswept_column_length_matches_total_for_both_policies() {
        let mesh = mesh_of(plate(), PanelShapePolicy::Quads);
        for aligned in [false, true] {
            let params = WakeParams {
                panels: 6,
                growth_factor: 1.2,
                length: 20.0,
                aligned,
            };
            let wake = GenerateWake::new(&mesh, params).execute().unwrap();
            assert_eq!(wake.columns().len(), 6);
            for c in 0..wake.columns().len() {
                assert_relative_eq!(wake.column_length(c), 20.0, epsilon = 1e-9);
            }
            wake.check_columns(6).unwrap();
        }
    }

    #[test]
    fn aligned_wake_ends_on_common_plane() {
        let mesh = mesh_of(swept(false), PanelShapePolicy::Quads);
        let params = WakeParams {
            aligned: true,
            ..WakeParams::default()
        };
        let wake = GenerateWake::new(&mesh, params).execute().unwrap();
        let ends: Vec<f64> = wake
            .chains()
            .map(|(nodes, _)| wake.nodes()[*nodes.last().unwrap()].x)
            .collect();
        for x in &ends {
            assert_relative_eq!(*x, ends[0], epsilon = 1e-9);
        }
        let tip_x = mesh.nodes().iter().map(|p| p.x).fold(f64::MIN, f64::max);
        assert_relative_eq!(ends[0], tip_x + params.length, epsilon = 1e-9);

        let free = GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap();
        for (c, _) in free.columns().iter().enumerate() {
            assert_relative_eq!(free.column_length(c), 30.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn aligned_swept_columns_add_their_stagger() {
        let mesh = mesh_of(swept(false), PanelShapePolicy::Quads);
        let params = WakeParams {
            aligned: true,
            ..WakeParams::default()
        };
        let wake = GenerateWake::new(&mesh, params).execute().unwrap();
        let plane = mesh.nodes().iter().map(|p| p.x).fold(f64::MIN, f64::max);
        let mut lengths = Vec::new();
        for c in 0..wake.columns().len() {
            let (left, right) = wake.trailing_points(c);
            let stagger = plane - 0.5 * (left.x + right.x);
            assert_relative_eq!(wake.column_length(c), params.length + stagger, epsilon = 1e-9);
            lengths.push((0.5 * (left.y + right.y).abs(), wake.column_length(c)));
        }
        // Swept back: the root column trails furthest upstream and so is longest.
        lengths.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(lengths[0].1 > lengths[lengths.len() - 1].1 + 0.1);
    }

    #[test]
    fn thick_wing_columns_pair_top_and_bottom() {
        let mesh = mesh_of(swept(true), PanelShapePolicy::Quads);
        let wake = GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap();
        assert_eq!(wake.columns().len(), 6);
        for column in wake.columns() {
            assert_eq!(mesh.panel(column.upper).position, PositionTag::Top);
            let lower = column.lower.unwrap();
            assert_eq!(mesh.panel(lower).position, PositionTag::Bottom);
            // Wake normal points to the suction side.
            let first = &wake.panels()[column.panels[0]];
            assert!(first.normal.z > 0.9);
        }
        wake.check_columns(5).unwrap();
    }

    #[test]
    fn triangular_mesh_sheds_one_column_per_strip() {
        let mesh = mesh_of(plate(), PanelShapePolicy::Triangles);
        let wake = GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap();
        assert_eq!(wake.columns().len(), 6);
        let strips: Vec<_> = wake.columns().iter().map(|c| c.strip.unwrap()).collect();
        assert_eq!(strips, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn broken_chain_is_detected() {
        let mesh = mesh_of(plate(), PanelShapePolicy::Quads);
        let mut wake = GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap();
        let second = wake.columns[0].panels[1];
        wake.panels[second].neighbors[NeighborSlot::Upstream.index()] = None;
        assert!(wake.check_columns(5).is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mesh = mesh_of(plate(), PanelShapePolicy::Quads);
        let params = WakeParams {
            panels: 0,
            ..WakeParams::default()
        };
        assert!(GenerateWake::new(&mesh, params).execute().is_err());
    }
}
