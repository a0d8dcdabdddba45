use std::borrow::Cow;

use tracing::{debug, warn};

use crate::error::{MeshError, Result};
use crate::math::{Point3, TOLERANCE};

use super::{
    check_connectivity, link_neighbors, NeighborSlot, NodeArray, Panel, PanelMesh, PanelShape,
    Part, PartId, PartKind, PartStore, PositionTag, Strip, SurfaceGrid, SurfaceKind, VortexRing,
    NODE_TOLERANCE,
};

/// Which panel shapes the builder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelShapePolicy {
    Quads,
    /// Every quad cell is split into two triangles.
    Triangles,
}

/// Turns the parts of a [`PartStore`] into a single [`PanelMesh`].
///
/// Coincident grid points of all parts are merged into one node array,
/// neighbours are linked across shared edges and the result is checked for
/// mutual connectivity.
pub struct BuildPanelMesh<'a> {
    store: &'a PartStore,
    policy: PanelShapePolicy,
    deflections: Vec<f64>,
    tolerance: f64,
    thin_only: bool,
}

impl<'a> BuildPanelMesh<'a> {
    #[must_use]
    pub fn new(store: &'a PartStore, policy: PanelShapePolicy) -> Self {
        Self {
            store,
            policy,
            deflections: Vec::new(),
            tolerance: NODE_TOLERANCE,
            thin_only: false,
        }
    }

    /// Per-part deflection angles in degrees, in store order. Missing entries
    /// mean no deflection.
    #[must_use]
    pub fn with_deflections(mut self, angles: Vec<f64>) -> Self {
        self.deflections = angles;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Mesh thick lifting parts by their mean surface and leave bodies out,
    /// as lattice methods require.
    #[must_use]
    pub fn thin_surfaces_only(mut self, thin_only: bool) -> Self {
        self.thin_only = thin_only;
        self
    }

    /// Executes the build.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NoPanels`] if nothing was paneled,
    /// [`MeshError::Degenerate`] if a part yields no valid panel or a cell
    /// has zero area, and [`MeshError::ConnectivityMismatch`] if linking
    /// produces a one-sided neighbour.
    pub fn execute(&self) -> Result<PanelMesh> {
        if self.store.is_empty() {
            return Err(MeshError::NoPanels.into());
        }
        let mut nodes = NodeArray::new(self.tolerance);
        let mut panels = Vec::new();
        let mut strips = Vec::new();

        for (k, (id, part)) in self.store.iter().enumerate() {
            let angle = self.deflections.get(k).copied().unwrap_or(0.0);
            let part: Cow<'_, Part> = if angle.abs() < TOLERANCE {
                Cow::Borrowed(part)
            } else {
                Cow::Owned(part.deflected(angle)?)
            };
            let Some(surfaces) = self.surfaces_for(&part)? else {
                continue;
            };

            let first = panels.len();
            let mut cells = Vec::with_capacity(surfaces.len());
            for grid in surfaces.iter() {
                cells.push(self.add_grid(grid, id, &part.name, &mut nodes, &mut panels)?);
            }
            if panels.len() == first {
                return Err(MeshError::Degenerate(format!("part '{}' produced no panels", part.name)).into());
            }
            if part.kind != PartKind::Fuselage {
                add_strips(id, part.kind, &surfaces, &cells, &mut panels, &mut strips);
            }
            debug!(part = %part.name, panels = panels.len() - first, "paneled part");
        }

        if panels.is_empty() {
            return Err(MeshError::NoPanels.into());
        }
        link_neighbors(&mut panels);
        check_connectivity(&panels)?;
        PanelMesh::from_parts(nodes.into_points(), panels, strips)
    }

    fn surfaces_for<'p>(&self, part: &'p Part) -> Result<Option<Cow<'p, [SurfaceGrid]>>> {
        if !self.thin_only {
            return Ok(Some(Cow::Borrowed(&part.surfaces)));
        }
        if part.kind == PartKind::Fuselage {
            return Ok(None);
        }
        if part.surface_kind == SurfaceKind::Thin {
            return Ok(Some(Cow::Borrowed(&part.surfaces)));
        }
        let top = part.surfaces.iter().find(|g| g.position == PositionTag::Top);
        let bottom = part.surfaces.iter().find(|g| g.position == PositionTag::Bottom);
        let (Some(top), Some(bottom)) = (top, bottom) else {
            return Err(MeshError::Degenerate(format!(
                "thick part '{}' lacks a top or bottom surface",
                part.name
            ))
            .into());
        };
        if top.rows() != bottom.rows() || top.columns() != bottom.columns() {
            return Err(MeshError::Degenerate(format!(
                "top and bottom grids of '{}' differ in size",
                part.name
            ))
            .into());
        }
        let points = top
            .points()
            .iter()
            .zip(bottom.points())
            .map(|(a, b)| Point3::from((a.coords + b.coords) * 0.5))
            .collect();
        let mean = SurfaceGrid::new(points, top.rows(), top.columns(), PositionTag::Mid)?
            .with_trailing_edge(top.trailing);
        Ok(Some(Cow::Owned(vec![mean])))
    }

    /// Panels every cell of `grid`. Returns, per cell in row-major order, the
    /// indices of the panels it produced.
    fn add_grid(
        &self,
        grid: &SurfaceGrid,
        part: PartId,
        name: &str,
        nodes: &mut NodeArray,
        panels: &mut Vec<Panel>,
    ) -> Result<Vec<Vec<usize>>> {
        let (rows, columns) = (grid.rows(), grid.columns());
        let ids: Vec<usize> = grid.points().iter().map(|&p| nodes.insert(p)).collect();
        let id = |i: usize, j: usize| ids[i * columns + j];
        let mut cells = Vec::with_capacity((rows - 1) * (columns - 1));

        for i in 0..rows - 1 {
            for j in 0..columns - 1 {
                let (corners, slots, te_local) = if grid.reversed {
                    (
                        [(i, j), (i, j + 1), (i + 1, j + 1), (i + 1, j)],
                        [
                            NeighborSlot::Upstream,
                            NeighborSlot::Right,
                            NeighborSlot::Downstream,
                            NeighborSlot::Left,
                        ],
                        2,
                    )
                } else {
                    (
                        [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)],
                        [
                            NeighborSlot::Left,
                            NeighborSlot::Downstream,
                            NeighborSlot::Right,
                            NeighborSlot::Upstream,
                        ],
                        1,
                    )
                };
                let quad = corners.map(|(a, b)| id(a, b));
                let te = (grid.trailing && i == rows - 2).then_some(te_local);

                let made = make_cell_panels(&quad, &slots, te, self.policy, nodes.points(), grid.position)?;
                if made.is_empty() {
                    warn!(part = name, cell = cells.len(), row = i, column = j, "skipping collapsed cell");
                }
                let mut cell = Vec::with_capacity(2);
                for mut panel in made {
                    panel.part = Some(part);
                    if grid.position == PositionTag::Mid && panel.shape == PanelShape::Quad {
                        attach_ring(&mut panel, grid, &corners, i, j);
                    }
                    cell.push(panels.len());
                    panels.push(panel);
                }
                cells.push(cell);
            }
        }
        Ok(cells)
    }
}

struct CellEdge {
    start: usize,
    slot: NeighborSlot,
    trailing: bool,
}

/// Builds the panels of one grid cell, collapsing repeated corners.
fn make_cell_panels(
    quad: &[usize; 4],
    slots: &[NeighborSlot; 4],
    te: Option<usize>,
    policy: PanelShapePolicy,
    nodes: &[Point3],
    position: PositionTag,
) -> Result<Vec<Panel>> {
    let edges: Vec<CellEdge> = (0..4)
        .filter(|&k| quad[k] != quad[(k + 1) % 4])
        .map(|k| CellEdge {
            start: quad[k],
            slot: slots[k],
            trailing: te == Some(k),
        })
        .collect();

    match edges.len() {
        4 if policy == PanelShapePolicy::Quads => Ok(vec![panel_from_edges(
            PanelShape::Quad,
            &edges,
            nodes,
            position,
        )?]),
        4 => {
            let first = [&edges[0], &edges[1]];
            let second = [&edges[2], &edges[3]];
            let t1 = [
                CellEdge { start: edges[0].start, slot: edges[0].slot, trailing: edges[0].trailing },
                CellEdge { start: edges[1].start, slot: edges[1].slot, trailing: edges[1].trailing },
                CellEdge { start: edges[2].start, slot: free_slot(&first), trailing: false },
            ];
            let t2 = [
                CellEdge { start: edges[0].start, slot: free_slot(&second), trailing: false },
                CellEdge { start: edges[2].start, slot: edges[2].slot, trailing: edges[2].trailing },
                CellEdge { start: edges[3].start, slot: edges[3].slot, trailing: edges[3].trailing },
            ];
            Ok(vec![
                panel_from_edges(PanelShape::Triangle, &t1, nodes, position)?,
                panel_from_edges(PanelShape::Triangle, &t2, nodes, position)?,
            ])
        }
        3 => Ok(vec![panel_from_edges(PanelShape::Triangle, &edges, nodes, position)?]),
        _ => Ok(Vec::new()),
    }
}

fn free_slot(used: &[&CellEdge; 2]) -> NeighborSlot {
    NeighborSlot::ALL
        .into_iter()
        .find(|s| used.iter().all(|e| e.slot != *s))
        .unwrap_or(NeighborSlot::Right)
}

fn panel_from_edges(
    shape: PanelShape,
    edges: &[CellEdge],
    nodes: &[Point3],
    position: PositionTag,
) -> Result<Panel> {
    let indices: Vec<usize> = edges.iter().map(|e| e.start).collect();
    let mut panel = Panel::new(shape, &indices, nodes, position)?;
    let mut used = Vec::with_capacity(4);
    for (k, edge) in edges.iter().enumerate() {
        panel.edge_slots[k] = edge.slot;
        used.push(edge.slot);
        if edge.trailing {
            panel.trailing_edge = Some(k);
        }
    }
    if edges.len() == 3 {
        if let Some(spare) = NeighborSlot::ALL.into_iter().find(|s| !used.contains(s)) {
            panel.edge_slots[3] = spare;
        }
    }
    Ok(panel)
}

/// Shifts the ring of a thin quad a quarter chord downstream and moves the
/// collocation point to the three-quarter chord.
fn attach_ring(
    panel: &mut Panel,
    grid: &SurfaceGrid,
    corners: &[(usize, usize); 4],
    i: usize,
    j: usize,
) {
    let ring = VortexRing {
        corners: corners.map(|(a, b)| grid.quarter_point(a, b)),
    };
    let three_quarter = |column: usize| {
        let front = grid.point(i, column);
        front + (grid.point(i + 1, column) - front) * 0.75
    };
    let (left, right) = (three_quarter(j), three_quarter(j + 1));
    panel.ring = Some(ring);
    panel.collocation = Point3::from((left.coords + right.coords) * 0.5);
}

fn add_strips(
    part: PartId,
    kind: PartKind,
    surfaces: &[SurfaceGrid],
    cells: &[Vec<Vec<usize>>],
    panels: &mut [Panel],
    strips: &mut Vec<Strip>,
) {
    let Some(upper) = surfaces
        .iter()
        .position(|g| matches!(g.position, PositionTag::Mid | PositionTag::Top))
    else {
        return;
    };
    let grid = &surfaces[upper];
    let lower = surfaces.iter().position(|g| {
        g.position == PositionTag::Bottom
            && g.rows() == grid.rows()
            && g.columns() == grid.columns()
    });
    let (rows, columns) = (grid.rows(), grid.columns());
    let last = rows - 1;

    for j in 0..columns - 1 {
        let column_panels = |surface: usize| -> Vec<usize> {
            (0..rows - 1)
                .flat_map(|i| cells[surface][i * (columns - 1) + j].iter().copied())
                .collect()
        };
        let upper_panels = column_panels(upper);
        let lower_panels = lower.map(column_panels).unwrap_or_default();
        if upper_panels.is_empty() {
            continue;
        }
        let leading = Point3::from((grid.point(0, j).coords + grid.point(0, j + 1).coords) * 0.5);
        let trailing = Point3::from((grid.point(last, j).coords + grid.point(last, j + 1).coords) * 0.5);
        let quarter = |column: usize| {
            let front = grid.point(0, column);
            front + (grid.point(last, column) - front) * 0.25
        };
        let span_vec = grid.point(0, j + 1) - grid.point(0, j);
        let width = (span_vec.y * span_vec.y + span_vec.z * span_vec.z).sqrt();

        let index = strips.len();
        for &p in upper_panels.iter().chain(&lower_panels) {
            panels[p].strip = Some(index);
        }
        strips.push(Strip {
            part,
            kind,
            upper: upper_panels,
            lower: lower_panels,
            leading,
            trailing,
            left: quarter(j),
            right: quarter(j + 1),
            chord: (trailing - leading).norm(),
            width,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::mesh::{BodyOfRevolution, WingShape};
    use approx::assert_relative_eq;

    fn thin_store(nc: usize, ns: usize) -> PartStore {
        let mut store = PartStore::new();
        store.insert(Part::new(
            "plate",
            PartKind::Wing,
            SurfaceKind::Thin,
            vec![SurfaceGrid::flat_plate(1.0, 8.0, nc, ns)],
        ));
        store
    }

    fn thick_store() -> PartStore {
        let shape = WingShape {
            chord_panels: 6,
            span_panels: 4,
            ..WingShape::default()
        };
        let mut store = PartStore::new();
        store.insert(Part::new(
            "wing",
            PartKind::Wing,
            SurfaceKind::Thick,
            shape.thick_surfaces().unwrap(),
        ));
        store
    }

    #[test]
    fn flat_plate_quads() {
        let store = thin_store(4, 6);
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        assert_eq!(mesh.len(), 24);
        assert_eq!(mesh.nodes().len(), 5 * 7);
        assert_eq!(mesh.strips().len(), 6);
        assert_eq!(mesh.panels().iter().filter(|p| p.is_trailing()).count(), 6);
        assert!(mesh.panels().iter().all(|p| p.ring.is_some()));
    }

    #[test]
    fn triangle_policy_doubles_panels() {
        let store = thin_store(4, 6);
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Triangles).execute().unwrap();
        assert_eq!(mesh.len(), 48);
        assert_eq!(mesh.panels().iter().filter(|p| p.is_trailing()).count(), 6);
        assert!(mesh.panels().iter().all(|p| p.shape == PanelShape::Triangle));
    }

    #[test]
    fn ring_collocation_at_three_quarter_chord() {
        let store = thin_store(1, 1);
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        let panel = mesh.panel(0);
        assert_relative_eq!(panel.collocation.x, 0.75, epsilon = 1e-12);
        let ring = panel.ring.unwrap();
        assert_relative_eq!(ring.corners[0].x, 0.25, epsilon = 1e-12);
        assert_relative_eq!(ring.corners[1].x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn thick_wing_is_closed() {
        let store = thick_store();
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        assert!(mesh.total_vector_area().norm() < 1e-9);
        // Tip patches collapse at the leading and trailing edges.
        let triangles = mesh.panels().iter().filter(|p| p.shape == PanelShape::Triangle).count();
        assert_eq!(triangles, 4);
        for panel in mesh.panels() {
            let linked = panel.neighbors.iter().filter(|n| n.is_some()).count();
            let expected = panel.shape.vertex_count() - usize::from(panel.is_trailing());
            assert_eq!(linked, expected);
        }
    }

    #[test]
    fn thick_wing_as_mean_surface_for_lattice() {
        let store = thick_store();
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads)
            .thin_surfaces_only(true)
            .execute()
            .unwrap();
        assert_eq!(mesh.len(), 24);
        assert!(mesh.panels().iter().all(|p| p.position == PositionTag::Mid));
    }

    #[test]
    fn body_is_closed_and_skipped_for_lattice() {
        let mut store = PartStore::new();
        let body = BodyOfRevolution {
            nose: Point3::new(-0.5, 0.0, 0.0),
            length: 3.0,
            max_radius: 0.2,
            axial_panels: 10,
            hoop_panels: 8,
        };
        store.insert(Part::new("fuse", PartKind::Fuselage, SurfaceKind::Thick, vec![body.build().unwrap()]));
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        assert!(mesh.total_vector_area().norm() < 1e-9);
        let outward = mesh
            .panels()
            .iter()
            .all(|p| p.normal.dot(&Vector3::new(0.0, p.centroid.y, p.centroid.z)) > 0.0);
        assert!(outward);

        let lattice = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).thin_surfaces_only(true).execute();
        assert!(lattice.is_err());
    }

    #[test]
    fn collapsed_cell_is_skipped() {
        crate::testing::init_tracing();
        // Columns 0 and 1 coincide, so the first cell has only two distinct nodes.
        let points = [0.0, 1.0]
            .iter()
            .flat_map(|&x| [0.0, 0.0, 1.0].map(|y| Point3::new(x, y, 0.0)))
            .collect();
        let grid = SurfaceGrid::new(points, 2, 3, PositionTag::Mid).unwrap().with_trailing_edge(true);
        let mut store = PartStore::new();
        store.insert(Part::new("sliver", PartKind::Wing, SurfaceKind::Thin, vec![grid]));
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh.strips().len(), 1);
        assert_relative_eq!(mesh.panels()[0].area, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_store_has_no_panels() {
        let store = PartStore::new();
        let err = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap_err();
        assert!(matches!(err, crate::PanelflowError::Mesh(MeshError::NoPanels)));
    }

    #[test]
    fn reference_dims_of_rectangular_wing() {
        let store = thin_store(4, 8);
        let mesh = BuildPanelMesh::new(&store, PanelShapePolicy::Quads).execute().unwrap();
        let dims = mesh.reference_dims().unwrap();
        assert_relative_eq!(dims.area, 8.0, epsilon = 1e-9);
        assert_relative_eq!(dims.span, 8.0, epsilon = 1e-9);
        assert_relative_eq!(dims.chord, 1.0, epsilon = 1e-9);
    }
}
