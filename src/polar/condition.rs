use crate::math::{wind_direction, Vector3};

/// One flight condition. Angles are in degrees, rates in rad/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingCondition {
    pub alpha: f64,
    pub beta: f64,
    pub p: f64,
    pub q: f64,
    pub r: f64,
    /// Freestream speed, m/s.
    pub speed: f64,
    /// Fluid density, kg/m³.
    pub density: f64,
    /// Kinematic viscosity, m²/s.
    pub viscosity: f64,
}

impl Default for OperatingCondition {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            beta: 0.0,
            p: 0.0,
            q: 0.0,
            r: 0.0,
            speed: 10.0,
            density: 1.225,
            viscosity: 1.5e-5,
        }
    }
}

impl OperatingCondition {
    #[must_use]
    pub fn new(alpha: f64, speed: f64) -> Self {
        Self {
            alpha,
            speed,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_rates(mut self, p: f64, q: f64, r: f64) -> Self {
        self.p = p;
        self.q = q;
        self.r = r;
        self
    }

    #[must_use]
    pub fn with_fluid(mut self, density: f64, viscosity: f64) -> Self {
        self.density = density;
        self.viscosity = viscosity;
        self
    }

    /// Freestream velocity in body axes.
    #[must_use]
    pub fn freestream(&self) -> Vector3 {
        wind_direction(self.alpha.to_radians(), self.beta.to_radians()) * self.speed
    }

    /// Body rotation rates `(p, q, r)`.
    #[must_use]
    pub fn rates(&self) -> Vector3 {
        Vector3::new(self.p, self.q, self.r)
    }

    #[must_use]
    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density * self.speed * self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn freestream_points_aft_and_up_at_positive_alpha() {
        let c = OperatingCondition::new(10.0, 20.0);
        let v = c.freestream();
        assert_relative_eq!(v.norm(), 20.0, epsilon = 1e-12);
        assert!(v.x > 0.0 && v.z > 0.0);
        assert_relative_eq!(c.dynamic_pressure(), 245.0, epsilon = 1e-9);
    }

    #[test]
    fn positive_sideslip_blows_from_starboard() {
        let v = OperatingCondition::new(0.0, 1.0).with_beta(5.0).freestream();
        assert!(v.y < 0.0);
    }
}
