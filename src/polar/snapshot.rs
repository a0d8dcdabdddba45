use crate::forces::{AeroCoefficients, SpanStation, StabilityDerivatives};
use crate::math::Vector3;

use super::OperatingCondition;

/// Convergence status of a computed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    Converged,
    /// Free-wake relaxation hit its iteration cap; results are from the last
    /// iterate.
    NotConverged,
}

/// Result of one operating point.
#[derive(Debug, Clone)]
pub struct SolutionSnapshot {
    /// Condition as evaluated: trimmed alpha and fixed-lift speed included.
    pub condition: OperatingCondition,
    pub control: f64,
    pub doublets: Vec<f64>,
    pub sources: Vec<f64>,
    pub wake_strengths: Vec<f64>,
    /// Pressure coefficient per body panel; a pressure jump on thin panels.
    pub cp: Vec<f64>,
    /// Surface or bound-vortex velocity per body panel.
    pub velocities: Vec<Vector3>,
    /// Body-axis force, N.
    pub force: Vector3,
    /// Body-axis moment about the centre of gravity, N·m.
    pub moment: Vector3,
    pub coefficients: AeroCoefficients,
    pub span: Vec<SpanStation>,
    pub stability: Option<StabilityDerivatives>,
    pub status: PointStatus,
}

impl SolutionSnapshot {
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.status == PointStatus::Converged
    }
}
