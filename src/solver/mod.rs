//! Influence matrix assembly, Kutta condition and unit-solution superposition.

mod assembly;
mod factor;
mod kutta;
mod superposition;

pub use assembly::{BodySystem, InfluenceMatrixBuilder};
pub use factor::FactorizedSystem;
pub use kutta::KuttaMap;
pub use superposition::{
    dof_weights, relative_wind, Strengths, UnitDof, UnitInducedVelocities, UnitSolutionSuperposer,
    UnitSolutions,
};
