/// Non-dimensional force and moment coefficients of one point.
///
/// Lift, drag and side force are in wind axes; rolling, pitching and yawing
/// moments are in body axes about the centre of gravity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AeroCoefficients {
    pub cl: f64,
    /// Total drag: induced, viscous, extra and fuselage friction.
    pub cd: f64,
    pub cy: f64,
    pub cl_roll: f64,
    pub cm: f64,
    pub cn: f64,
    /// Induced drag from the surface force integral.
    pub cdi_near: f64,
    /// Induced drag from the wake in the Trefftz plane.
    pub cdi_trefftz: f64,
    pub cd_viscous: f64,
    pub cd_extra: f64,
    pub cd_fuse: f64,
}

impl AeroCoefficients {
    /// Lift-to-drag ratio, `0` when drag vanishes.
    #[must_use]
    pub fn finesse(&self) -> f64 {
        if self.cd.abs() < f64::EPSILON {
            0.0
        } else {
            self.cl / self.cd
        }
    }
}

/// Spanwise loading of one strip.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpanStation {
    /// Lateral position of the strip's quarter-chord point.
    pub y: f64,
    pub chord: f64,
    /// Bound circulation, m²/s.
    pub circulation: f64,
    pub cl: f64,
    pub cd_induced: f64,
    pub cd_profile: f64,
}
