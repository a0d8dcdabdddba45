pub mod error;
pub mod forces;
pub mod kernel;
pub mod math;
pub mod mesh;
pub mod polar;
pub mod solver;
pub mod task;

#[cfg(test)]
mod testing;

pub use error::{PanelflowError, Result};
