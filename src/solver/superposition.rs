//! Unit solutions for the six rigid-body degrees of freedom.
//!
//! The relative wind seen by the body is linear in the freestream components
//! and the rotation rates, so the doublet and source strengths of any
//! operating point are a weighted sum of six precomputed solutions.

use rayon::prelude::*;

use crate::error::Result;
use crate::kernel::{body_velocity_row, source_velocity_row, wake_velocity_row, InfluenceStrategy};
use crate::math::{DMatrix, DVector, Point3, Vector3};
use crate::mesh::{PanelMesh, WakeMesh};
use crate::task::CancelToken;

use super::{FactorizedSystem, KuttaMap};

/// Rigid-body degree of freedom of the relative wind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitDof {
    /// Freestream along body x.
    U,
    V,
    W,
    /// Roll rate about body x through the reference point.
    P,
    Q,
    R,
}

impl UnitDof {
    pub const ALL: [Self; 6] = [Self::U, Self::V, Self::W, Self::P, Self::Q, Self::R];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::U => 0,
            Self::V => 1,
            Self::W => 2,
            Self::P => 3,
            Self::Q => 4,
            Self::R => 5,
        }
    }

    fn axis(self) -> Vector3 {
        match self {
            Self::U | Self::P => Vector3::x(),
            Self::V | Self::Q => Vector3::y(),
            Self::W | Self::R => Vector3::z(),
        }
    }

    /// Relative wind at `point` for a unit value of this degree of freedom.
    /// A rotation of the body about `e` is seen as the wind `-e x (r - ref)`.
    #[must_use]
    pub fn velocity(self, point: &Point3, reference: &Point3) -> Vector3 {
        match self {
            Self::U | Self::V | Self::W => self.axis(),
            Self::P | Self::Q | Self::R => -self.axis().cross(&(point - reference)),
        }
    }
}

/// Weights of the six unit solutions for a freestream vector and body rates.
#[must_use]
pub fn dof_weights(freestream: &Vector3, rates: &Vector3) -> [f64; 6] {
    [freestream.x, freestream.y, freestream.z, rates.x, rates.y, rates.z]
}

/// Relative wind at `point`: `V∞ - Ω x (r - ref)`.
#[must_use]
pub fn relative_wind(freestream: &Vector3, rates: &Vector3, point: &Point3, reference: &Point3) -> Vector3 {
    freestream - rates.cross(&(point - reference))
}

/// Doublet and source strengths of a combined solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Strengths {
    pub doublets: DVector,
    pub sources: DVector,
}

/// Body strengths for each unit degree of freedom.
#[derive(Debug, Clone)]
pub struct UnitSolutions {
    units: Vec<Strengths>,
}

impl UnitSolutions {
    #[must_use]
    pub fn unit(&self, dof: UnitDof) -> &Strengths {
        &self.units[dof.index()]
    }

    /// Weighted sum of the unit solutions.
    #[must_use]
    pub fn combine(&self, weights: &[f64; 6]) -> Strengths {
        let n = self.units[0].doublets.len();
        let mut doublets = DVector::zeros(n);
        let mut sources = DVector::zeros(n);
        for (unit, &w) in self.units.iter().zip(weights) {
            if w != 0.0 {
                doublets.axpy(w, &unit.doublets, 1.0);
                sources.axpy(w, &unit.sources, 1.0);
            }
        }
        Strengths { doublets, sources }
    }
}

/// Solves the factorized system once per degree of freedom.
pub struct UnitSolutionSuperposer<'a> {
    mesh: &'a PanelMesh,
    system: &'a FactorizedSystem,
    sources: &'a DMatrix,
    reference: Point3,
}

impl<'a> UnitSolutionSuperposer<'a> {
    /// `sources` is the body source block matching the rows of `system`.
    #[must_use]
    pub fn new(mesh: &'a PanelMesh, system: &'a FactorizedSystem, sources: &'a DMatrix, reference: Point3) -> Self {
        Self {
            mesh,
            system,
            sources,
            reference,
        }
    }

    /// Source strengths `σ = -V·n` on thick panels; thin panels carry none.
    #[must_use]
    pub fn source_strengths(&self, dof: UnitDof) -> DVector {
        DVector::from_iterator(
            self.mesh.len(),
            self.mesh.panels().iter().map(|p| {
                if p.is_thin() {
                    0.0
                } else {
                    -dof.velocity(&p.collocation, &self.reference).dot(&p.normal)
                }
            }),
        )
    }

    /// # Errors
    ///
    /// Returns [`crate::error::SolverError`] if a back substitution fails.
    pub fn solve(&self) -> Result<UnitSolutions> {
        let units = UnitDof::ALL
            .iter()
            .map(|&dof| {
                let sigma = self.source_strengths(dof);
                let mut rhs = -(self.sources * &sigma);
                for (i, panel) in self.mesh.panels().iter().enumerate() {
                    if panel.is_thin() {
                        rhs[i] -= dof.velocity(&panel.collocation, &self.reference).dot(&panel.normal);
                    }
                }
                let doublets = self.system.solve(&rhs)?;
                Ok(Strengths {
                    doublets,
                    sources: sigma,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(UnitSolutions { units })
    }
}

/// Induced velocity at the bound vortex midpoints of thin panels, per unit
/// degree of freedom.
#[derive(Debug, Clone, Default)]
pub struct UnitInducedVelocities {
    /// Body panel index of each evaluation point.
    panels: Vec<usize>,
    points: Vec<Point3>,
    velocities: Vec<[Vector3; 6]>,
}

impl UnitInducedVelocities {
    /// Evaluates body, wake and source contributions in parallel over the
    /// thin panels.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SolverError::Cancelled`] when cancelled.
    pub fn compute(
        strategy: &dyn InfluenceStrategy,
        mesh: &PanelMesh,
        wake: &WakeMesh,
        kutta: &KuttaMap,
        units: &UnitSolutions,
        cancel: Option<&CancelToken>,
    ) -> Result<Self> {
        let params = strategy.params();
        let (panels, points): (Vec<usize>, Vec<Point3>) = mesh
            .panels()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_thin())
            .filter_map(|(i, p)| {
                let (a, b) = p.front_segment(mesh.nodes())?;
                Some((i, Point3::from((a.coords + b.coords) * 0.5)))
            })
            .unzip();
        let wake_strengths: Vec<Vec<f64>> = UnitDof::ALL
            .iter()
            .map(|&d| kutta.column_strengths(units.unit(d).doublets.as_slice()))
            .collect();

        let velocities = points
            .par_iter()
            .map(|point| -> Result<[Vector3; 6]> {
                if let Some(token) = cancel {
                    token.check()?;
                }
                let body = body_velocity_row(strategy, mesh, point);
                let source = source_velocity_row(mesh, params, point, None);
                let trailing = wake_velocity_row(wake, params, point);
                let mut out = [Vector3::zeros(); 6];
                for dof in UnitDof::ALL {
                    let unit = units.unit(dof);
                    let d = dof.index();
                    out[d] = weighted(&body, unit.doublets.as_slice())
                        + weighted(&source, unit.sources.as_slice())
                        + weighted(&trailing, &wake_strengths[d]);
                }
                Ok(out)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            panels,
            points,
            velocities,
        })
    }

    /// Combined induced velocity at the bound vortex of `panel`, if it is a
    /// thin panel.
    #[must_use]
    pub fn at_panel(&self, panel: usize, weights: &[f64; 6]) -> Option<Vector3> {
        let k = self.panels.binary_search(&panel).ok()?;
        Some(
            self.velocities[k]
                .iter()
                .zip(weights)
                .map(|(v, w)| v * *w)
                .sum(),
        )
    }

    /// Bound vortex midpoint of `panel`.
    #[must_use]
    pub fn point(&self, panel: usize) -> Option<Point3> {
        let k = self.panels.binary_search(&panel).ok()?;
        Some(self.points[k])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

fn weighted(row: &[Vector3], strengths: &[f64]) -> Vector3 {
    row.iter().zip(strengths).map(|(v, s)| v * *s).sum()
}
