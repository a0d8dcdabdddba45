use crate::error::{Result, SolverError};
use crate::math::DMatrix;
use crate::mesh::WakeMesh;

/// Kutta condition: each wake column carries the doublet jump of the body
/// panels it is shed from, `μ_upper - μ_lower` at a thick trailing edge and
/// `μ_upper` behind a thin one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KuttaMap {
    columns: Vec<(usize, Option<usize>)>,
}

impl KuttaMap {
    #[must_use]
    pub fn new(wake: &WakeMesh) -> Self {
        Self {
            columns: wake.columns().iter().map(|c| (c.upper, c.lower)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Adds the wake coupling to the body block, giving the square system
    /// matrix. The body block itself is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] if `coupling` does not have
    /// one row per body panel and one column per wake column.
    pub fn fold(&self, body: &DMatrix, coupling: &DMatrix) -> Result<DMatrix> {
        if coupling.ncols() != self.columns.len() {
            return Err(SolverError::DimensionMismatch {
                expected: self.columns.len(),
                actual: coupling.ncols(),
            }
            .into());
        }
        if coupling.nrows() != body.nrows() {
            return Err(SolverError::DimensionMismatch {
                expected: body.nrows(),
                actual: coupling.nrows(),
            }
            .into());
        }
        let mut system = body.clone();
        for (c, &(upper, lower)) in self.columns.iter().enumerate() {
            for i in 0..system.nrows() {
                let w = coupling[(i, c)];
                system[(i, upper)] += w;
                if let Some(lower) = lower {
                    system[(i, lower)] -= w;
                }
            }
        }
        Ok(system)
    }

    /// Wake column strengths implied by body doublet strengths.
    #[must_use]
    pub fn column_strengths(&self, doublets: &[f64]) -> Vec<f64> {
        self.columns
            .iter()
            .map(|&(upper, lower)| doublets[upper] - lower.map_or(0.0, |l| doublets[l]))
            .collect()
    }

    /// `(upper, lower)` body panels of each column.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        self.columns.iter().copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::{BuildPanelMesh, GenerateWake, PanelShapePolicy, WakeParams};
    use crate::testing::thick_wing_store;

    #[test]
    fn folds_upper_minus_lower() {
        let mesh = BuildPanelMesh::new(&thick_wing_store(4, 2), PanelShapePolicy::Quads)
            .execute()
            .unwrap();
        let wake = GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap();
        let kutta = KuttaMap::new(&wake);
        let n = mesh.len();
        let body = DMatrix::zeros(n, n);
        let coupling = DMatrix::from_element(n, kutta.len(), 1.0);
        let system = kutta.fold(&body, &coupling).unwrap();
        assert_eq!(body, DMatrix::zeros(n, n));
        for (upper, lower) in kutta.iter() {
            assert_eq!(system[(0, upper)], 1.0);
            assert_eq!(system[(0, lower.unwrap())], -1.0);
        }

        let mut mu = vec![0.0; n];
        let (upper, lower) = kutta.iter().next().unwrap();
        mu[upper] = 3.0;
        mu[lower.unwrap()] = 1.0;
        assert_eq!(kutta.column_strengths(&mu)[0], 2.0);
    }

    #[test]
    fn rejects_wrong_coupling_shape() {
        let mesh = BuildPanelMesh::new(&thick_wing_store(4, 2), PanelShapePolicy::Quads)
            .execute()
            .unwrap();
        let wake = GenerateWake::new(&mesh, WakeParams::default()).execute().unwrap();
        let kutta = KuttaMap::new(&wake);
        let n = mesh.len();
        let err = kutta
            .fold(&DMatrix::zeros(n, n), &DMatrix::zeros(n, kutta.len() + 1))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::PanelflowError::Solver(SolverError::DimensionMismatch { .. })
        ));
    }
}
