use crate::error::{AnalysisError, PanelflowError, Result};

/// Finds the angle of attack at which the pitching moment vanishes.
///
/// The root is bracketed from `±bracket` degrees, shrinking the bracket until
/// the moment changes sign, then refined by regula falsi with the Illinois
/// modification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimSolver {
    /// Initial half-width of the alpha bracket, degrees.
    pub bracket: f64,
    pub shrink: f64,
    pub max_shrinks: usize,
    /// Convergence threshold on the moment coefficient.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for TrimSolver {
    fn default() -> Self {
        Self {
            bracket: 30.0,
            shrink: 0.9,
            max_shrinks: 20,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

impl TrimSolver {
    /// Solves `cm(alpha) = 0`. `control` only labels the error.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::TrimNotConverged`] if no sign change is found
    /// or the iteration cap is hit, and forwards any error of `cm`.
    pub fn solve<F>(&self, control: f64, mut cm: F) -> Result<f64>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let fail = || -> PanelflowError { AnalysisError::TrimNotConverged { control }.into() };
        let mut half = self.bracket;
        let (mut a, mut fa, mut b, mut fb);
        let mut shrinks = 0;
        loop {
            a = -half;
            b = half;
            fa = cm(a)?;
            if fa.abs() < self.tolerance {
                return Ok(a);
            }
            fb = cm(b)?;
            if fb.abs() < self.tolerance {
                return Ok(b);
            }
            if fa.signum() != fb.signum() {
                break;
            }
            shrinks += 1;
            if shrinks > self.max_shrinks {
                return Err(fail());
            }
            half *= self.shrink;
        }

        // Side of the last retained end point: -1 for a, +1 for b.
        let mut side = 0;
        for _ in 0..self.max_iterations {
            let c = (a * fb - b * fa) / (fb - fa);
            let fc = cm(c)?;
            if fc.abs() < self.tolerance {
                return Ok(c);
            }
            if fc.signum() == fb.signum() {
                b = c;
                fb = fc;
                if side == -1 {
                    fa *= 0.5;
                }
                side = -1;
            } else {
                a = c;
                fa = fc;
                if side == 1 {
                    fb *= 0.5;
                }
                side = 1;
            }
        }
        Err(fail())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_moment_is_trimmed() {
        let alpha = TrimSolver::default()
            .solve(0.0, |a| Ok(0.05 - 0.02 * a))
            .unwrap();
        assert_relative_eq!(alpha, 2.5, epsilon = 1e-4);
    }

    #[test]
    fn nonlinear_moment_converges() {
        let solver = TrimSolver::default();
        let alpha = solver
            .solve(1.0, |a: f64| Ok(-(a - 4.0).to_radians().sin() - 0.01 * (a - 4.0).powi(3) / 100.0))
            .unwrap();
        assert_relative_eq!(alpha, 4.0, epsilon = 1e-3);
    }

    #[test]
    fn bracket_shrinks_around_a_root() {
        // Same sign at ±30 and ±27; only the root at 20 lies in the first
        // bracket that changes sign.
        let alpha = TrimSolver::default()
            .solve(0.0, |a: f64| Ok((a - 26.0) * (a - 20.0)))
            .unwrap();
        assert_relative_eq!(alpha, 20.0, epsilon = 1e-4);
    }

    #[test]
    fn moment_without_root_fails() {
        let err = TrimSolver::default().solve(2.0, |_| Ok(0.1)).unwrap_err();
        assert!(matches!(
            err,
            crate::PanelflowError::Analysis(AnalysisError::TrimNotConverged { control }) if control == 2.0
        ));
    }
}
