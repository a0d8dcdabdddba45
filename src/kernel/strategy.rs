use crate::error::Result;
use crate::math::{Point3, Vector3};
use crate::mesh::PanelMesh;

use super::{
    basis_potentials, doublet_potential, doublet_velocity, DensityKind, InfluenceStrategy,
    KernelParams, NodeAverage,
};

/// Constant doublet strength over each panel.
#[derive(Debug, Clone)]
pub struct UniformDensity {
    params: KernelParams,
}

impl UniformDensity {
    #[must_use]
    pub fn new(params: KernelParams) -> Self {
        Self { params }
    }
}

impl InfluenceStrategy for UniformDensity {
    fn density(&self) -> DensityKind {
        DensityKind::Uniform
    }

    fn params(&self) -> &KernelParams {
        &self.params
    }

    fn add_doublet_potentials(
        &self,
        mesh: &PanelMesh,
        point: &Point3,
        own: Option<usize>,
        scale: f64,
        row: &mut [f64],
    ) {
        let nodes = mesh.nodes();
        for (j, (panel, out)) in mesh.panels().iter().zip(row.iter_mut()).enumerate() {
            *out += scale * doublet_potential(panel, nodes, point, own == Some(j), &self.params);
        }
    }

    fn add_doublet_velocities(&self, mesh: &PanelMesh, point: &Point3, scale: f64, row: &mut [Vector3]) {
        let nodes = mesh.nodes();
        for (panel, out) in mesh.panels().iter().zip(row.iter_mut()) {
            *out += doublet_velocity(panel, nodes, point, &self.params) * scale;
        }
    }
}

/// Doublet strength varying linearly over triangles. Vertex values are
/// averages of the adjacent panel unknowns, so the system keeps one unknown
/// per panel.
#[derive(Debug, Clone)]
pub struct LinearDensity {
    params: KernelParams,
    average: NodeAverage,
}

impl LinearDensity {
    /// # Errors
    ///
    /// Returns [`crate::error::KernelError::LinearOnQuad`] if the mesh has a
    /// quad panel.
    pub fn new(mesh: &PanelMesh, params: KernelParams) -> Result<Self> {
        Ok(Self {
            params,
            average: NodeAverage::new(mesh)?,
        })
    }

    #[must_use]
    pub fn average(&self) -> &NodeAverage {
        &self.average
    }
}

impl InfluenceStrategy for LinearDensity {
    fn density(&self) -> DensityKind {
        DensityKind::Linear
    }

    fn params(&self) -> &KernelParams {
        &self.params
    }

    fn add_doublet_potentials(
        &self,
        mesh: &PanelMesh,
        point: &Point3,
        own: Option<usize>,
        scale: f64,
        row: &mut [f64],
    ) {
        let nodes = mesh.nodes();
        for (k, panel) in mesh.panels().iter().enumerate() {
            let basis = basis_potentials(panel, nodes, point, own == Some(k), &self.params);
            for (local, value) in basis.into_iter().enumerate() {
                let contributors = self.average.contributors(k, local);
                if contributors.is_empty() {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let share = scale * value / contributors.len() as f64;
                for &j in contributors {
                    row[j] += share;
                }
            }
        }
    }

    /// Velocities use the uniform ring of each panel at its mean vertex
    /// strength.
    fn add_doublet_velocities(&self, mesh: &PanelMesh, point: &Point3, scale: f64, row: &mut [Vector3]) {
        let nodes = mesh.nodes();
        for (k, panel) in mesh.panels().iter().enumerate() {
            let v = doublet_velocity(panel, nodes, point, &self.params) * (scale / 3.0);
            for local in 0..3 {
                let contributors = self.average.contributors(k, local);
                if contributors.is_empty() {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let share = v / contributors.len() as f64;
                for &j in contributors {
                    row[j] += share;
                }
            }
        }
    }
}
