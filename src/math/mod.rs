mod rotation;

pub use rotation::{rotate_about_axis, wind_axes, wind_direction};

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Dense column-major matrix used by the influence system.
pub type DMatrix = nalgebra::DMatrix<f64>;

/// Dense column vector used for strengths and right-hand sides.
pub type DVector = nalgebra::DVector<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// 4π, the normalisation of the free-space Green's function.
pub const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;

/// Standard gravity, m/s².
pub const GRAVITY: f64 = 9.81;
