mod build;
mod connectivity;
mod grid;
mod nodes;
mod panel;
mod part;
mod wake;

pub use build::{BuildPanelMesh, PanelShapePolicy};
pub use connectivity::{check_connectivity, link_neighbors};
pub use grid::{naca_half_thickness, BodyOfRevolution, SurfaceGrid, WingShape};
pub use nodes::{NodeArray, NODE_TOLERANCE};
pub use panel::{NeighborSlot, Panel, PanelShape, PositionTag, VortexRing};
pub use part::{ControlSurface, Part, PartId, PartKind, PartStore, SurfaceKind};
pub use wake::{geometric_steps, GenerateWake, WakeColumn, WakeMesh, WakeParams};

use crate::error::{MeshError, Result};
use crate::math::{Point3, Vector3};

/// One spanwise strip of a lifting part: the chordwise panels of a grid
/// column, upper (or mean) surface first.
#[derive(Debug, Clone)]
pub struct Strip {
    pub part: PartId,
    pub kind: PartKind,
    /// Mid or top panels, leading edge to trailing edge.
    pub upper: Vec<usize>,
    /// Bottom panels of a thick part, leading edge to trailing edge.
    pub lower: Vec<usize>,
    pub leading: Point3,
    pub trailing: Point3,
    /// Quarter-chord points of the strip's two edges, in grid column order.
    pub left: Point3,
    pub right: Point3,
    pub chord: f64,
    pub width: f64,
}

impl Strip {
    #[must_use]
    pub fn area(&self) -> f64 {
        self.chord * self.width
    }

    /// Mid-span point at the quarter chord.
    #[must_use]
    pub fn quarter_chord(&self) -> Point3 {
        self.leading + (self.trailing - self.leading) * 0.25
    }
}

/// Reference dimensions used to non-dimensionalise forces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceDims {
    pub area: f64,
    pub span: f64,
    pub chord: f64,
}

impl Default for ReferenceDims {
    fn default() -> Self {
        Self {
            area: 1.0,
            span: 1.0,
            chord: 1.0,
        }
    }
}

/// Body panels of all parts with their shared node array.
#[derive(Debug, Clone)]
pub struct PanelMesh {
    nodes: Vec<Point3>,
    panels: Vec<Panel>,
    strips: Vec<Strip>,
}

impl PanelMesh {
    /// Assembles a mesh from already built parts of it. Neighbour slots are
    /// taken as given.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::NoPanels`] for an empty panel list.
    pub fn from_parts(nodes: Vec<Point3>, panels: Vec<Panel>, strips: Vec<Strip>) -> Result<Self> {
        if panels.is_empty() {
            return Err(MeshError::NoPanels.into());
        }
        Ok(Self {
            nodes,
            panels,
            strips,
        })
    }

    #[must_use]
    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub(crate) fn panels_mut(&mut self) -> &mut [Panel] {
        &mut self.panels
    }

    #[must_use]
    pub fn panel(&self, index: usize) -> &Panel {
        &self.panels[index]
    }

    #[must_use]
    pub fn strips(&self) -> &[Strip] {
        &self.strips
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    #[must_use]
    pub fn has_thick_panels(&self) -> bool {
        self.panels.iter().any(|p| !p.is_thin())
    }

    /// Reference area, span and chord derived from the first wing's strips:
    /// planform area, lateral extent and their ratio.
    #[must_use]
    pub fn reference_dims(&self) -> Option<ReferenceDims> {
        let main = self.strips.iter().find(|s| s.kind == PartKind::Wing)?.part;
        let mut area = 0.0;
        let (mut ymin, mut ymax) = (f64::MAX, f64::MIN);
        for strip in self.strips.iter().filter(|s| s.part == main) {
            let dy = 0.5 * strip.width;
            let y = strip.leading.y;
            area += strip.area();
            ymin = ymin.min(y - dy);
            ymax = ymax.max(y + dy);
        }
        let span = ymax - ymin;
        if area <= 0.0 || span <= 0.0 {
            return None;
        }
        Some(ReferenceDims {
            area,
            span,
            chord: area / span,
        })
    }

    /// Sum of the vector areas of all panels. Vanishes for a closed body.
    #[must_use]
    pub fn total_vector_area(&self) -> Vector3 {
        self.panels.iter().map(|p| p.normal * p.area).sum()
    }
}
