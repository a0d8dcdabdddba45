use nalgebra::{Dyn, LU};

use crate::error::{Result, SolverError};
use crate::math::{DMatrix, DVector};

/// Smallest accepted ratio between the smallest and largest pivot.
const MIN_PIVOT_RATIO: f64 = 1e-14;

/// LU factorization of the system matrix, reused for every right-hand side.
#[derive(Debug, Clone)]
pub struct FactorizedSystem {
    lu: LU<f64, Dyn, Dyn>,
    size: usize,
}

impl FactorizedSystem {
    /// Factorizes a square matrix.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] for a non-square matrix,
    /// [`SolverError::Singular`] for a zero or non-finite pivot and
    /// [`SolverError::IllConditioned`] when the pivot ratio falls below
    /// `1e-14`.
    pub fn new(matrix: DMatrix) -> Result<Self> {
        let size = matrix.nrows();
        if matrix.ncols() != size {
            return Err(SolverError::DimensionMismatch {
                expected: size,
                actual: matrix.ncols(),
            }
            .into());
        }
        if size == 0 {
            return Err(SolverError::Singular { size }.into());
        }
        let lu = matrix.lu();
        let (mut smallest, mut largest) = (f64::MAX, 0.0_f64);
        for pivot in lu.u().diagonal().iter().map(|d| d.abs()) {
            if !pivot.is_finite() {
                return Err(SolverError::Singular { size }.into());
            }
            smallest = smallest.min(pivot);
            largest = largest.max(pivot);
        }
        if smallest == 0.0 {
            return Err(SolverError::Singular { size }.into());
        }
        let ratio = smallest / largest;
        if ratio < MIN_PIVOT_RATIO {
            return Err(SolverError::IllConditioned { ratio }.into());
        }
        Ok(Self { lu, size })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// # Errors
    ///
    /// Returns [`SolverError::DimensionMismatch`] for a right-hand side of the
    /// wrong length and [`SolverError::Singular`] if back substitution fails.
    pub fn solve(&self, rhs: &DVector) -> Result<DVector> {
        if rhs.len() != self.size {
            return Err(SolverError::DimensionMismatch {
                expected: self.size,
                actual: rhs.len(),
            }
            .into());
        }
        self.lu
            .solve(rhs)
            .ok_or_else(|| SolverError::Singular { size: self.size }.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solves_small_system() {
        let m = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0]);
        let system = FactorizedSystem::new(m.clone()).unwrap();
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let x = system.solve(&b).unwrap();
        assert_relative_eq!(m * x, b, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_is_reported() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let err = FactorizedSystem::new(m).unwrap_err();
        assert!(err.is_point_local());
    }

    #[test]
    fn wrong_rhs_length_is_rejected() {
        let system = FactorizedSystem::new(DMatrix::identity(3, 3)).unwrap();
        assert!(system.solve(&DVector::zeros(2)).is_err());
    }
}
