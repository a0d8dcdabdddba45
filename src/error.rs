use thiserror::Error;

/// Top-level error type for the panelflow solver.
#[derive(Debug, Error)]
pub enum PanelflowError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl PanelflowError {
    /// Returns `true` when the error only invalidates the operating point being
    /// computed, so that a sweep may carry on with the next point.
    #[must_use]
    pub fn is_point_local(&self) -> bool {
        match self {
            Self::Solver(SolverError::Singular { .. } | SolverError::IllConditioned { .. }) => true,
            Self::Analysis(
                AnalysisError::TrimNotConverged { .. }
                | AnalysisError::NonPositiveLift { .. }
                | AnalysisError::RelaxationDiverged { .. },
            ) => true,
            _ => false,
        }
    }

    /// Returns `true` when the error is a cooperative stop rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Solver(SolverError::Cancelled))
    }
}

/// Errors raised while building panels, strips and wakes.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("mesh has no panels")]
    NoPanels,

    #[error("panel {panel} slot {slot} refers to panel {neighbour} which does not refer back")]
    ConnectivityMismatch {
        panel: usize,
        slot: &'static str,
        neighbour: usize,
    },

    #[error("invalid wake column {column}: {reason}")]
    WakeColumn { column: usize, reason: String },

    #[error("part not found: {0}")]
    PartNotFound(String),

    #[error("index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

/// Errors related to singularity kernel configuration.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("parameter {parameter} = {value} must be positive")]
    NonPositive { parameter: &'static str, value: f64 },

    #[error("linear density requires triangular panels, panel {0} is a quad")]
    LinearOnQuad(usize),
}

/// Errors raised while assembling, factorizing or solving the linear system.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("influence matrix of size {size} is singular")]
    Singular { size: usize },

    #[error("influence matrix is ill-conditioned (pivot ratio {ratio:e})")]
    IllConditioned { ratio: f64 },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("computation cancelled")]
    Cancelled,
}

/// Errors raised while driving a polar.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis method {method} cannot run {polar} polars")]
    UnsupportedMethod { method: &'static str, polar: &'static str },

    #[error("control set has {controls} entries but the plane has {parts} parts")]
    ControlCountMismatch { controls: usize, parts: usize },

    #[error("trim did not converge at control value {control}")]
    TrimNotConverged { control: f64 },

    #[error("lift coefficient {cl} is not positive, cannot balance weight")]
    NonPositiveLift { cl: f64 },

    #[error("free wake relaxation diverged after {iterations} iterations")]
    RelaxationDiverged { iterations: usize },

    #[error("invalid polar configuration: {0}")]
    InvalidPolar(String),

    #[error("analysis worker panicked")]
    WorkerPanicked,
}

/// Convenience type alias for results using [`PanelflowError`].
pub type Result<T> = std::result::Result<T, PanelflowError>;
