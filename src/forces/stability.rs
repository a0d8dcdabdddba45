//! Stability derivatives by central differences of the superposed loads.
//!
//! Perturbations are taken in stability axes: `is` points into the wind in
//! the plane of symmetry, `js` to starboard and `ks` down.

use crate::math::{Point3, Vector3};
use crate::mesh::ReferenceDims;

/// Velocity perturbation, m/s.
pub const VELOCITY_STEP: f64 = 0.001;
/// Rate perturbation, rad/s.
pub const RATE_STEP: f64 = 0.01;

/// Dimensional and non-dimensional stability derivatives at a trimmed point.
///
/// Forces `X, Y, Z` and moments `L, M, N` are in stability axes; the
/// non-dimensional set follows the usual flight-dynamics normalisation with
/// `β = v / u0` and `α = w / u0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StabilityDerivatives {
    pub xu: f64,
    pub zu: f64,
    pub mu: f64,
    pub yv: f64,
    pub lv: f64,
    pub nv: f64,
    pub xw: f64,
    pub zw: f64,
    pub mw: f64,
    pub yp: f64,
    pub lp: f64,
    pub np: f64,
    pub xq: f64,
    pub zq: f64,
    pub mq: f64,
    pub yr: f64,
    pub lr: f64,
    pub nr: f64,

    pub cxu: f64,
    pub czu: f64,
    pub cmu: f64,
    pub cyb: f64,
    pub clb: f64,
    pub cnb: f64,
    pub cxa: f64,
    pub cza: f64,
    pub cma: f64,
    pub cyp: f64,
    pub clp: f64,
    pub cnp: f64,
    pub cxq: f64,
    pub czq: f64,
    pub cmq: f64,
    pub cyr: f64,
    pub clr: f64,
    pub cnr: f64,

    /// Body-axis x position of the neutral point, m.
    pub neutral_point: f64,
}

/// Stability axes at angle of attack `alpha` (radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityAxes {
    pub is: Vector3,
    pub js: Vector3,
    pub ks: Vector3,
}

impl StabilityAxes {
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        let (sin, cos) = alpha.sin_cos();
        Self {
            is: Vector3::new(-cos, 0.0, -sin),
            js: Vector3::y(),
            ks: Vector3::new(sin, 0.0, -cos),
        }
    }

    /// Body-axis freestream and rates for the perturbation
    /// `[u, v, w, p, q, r]` about a steady speed `u0`.
    #[must_use]
    pub fn kinematics(&self, u0: f64, state: &[f64; 6]) -> (Vector3, Vector3) {
        let [u, v, w, p, q, r] = *state;
        let wind = -(self.is * (u0 + u)) - self.js * v - self.ks * w;
        let rates = self.is * p + self.js * q + self.ks * r;
        (wind, rates)
    }

    fn components(&self, force: &Vector3, moment: &Vector3) -> [f64; 6] {
        [
            force.dot(&self.is),
            force.dot(&self.js),
            force.dot(&self.ks),
            moment.dot(&self.is),
            moment.dot(&self.js),
            moment.dot(&self.ks),
        ]
    }
}

/// Computes the derivatives of a configuration trimmed at `alpha` degrees and
/// speed `u0`.
///
/// `loads` maps a body-axis freestream and body rates to the body-axis force
/// and moment about `cog`; it is called twelve times.
pub fn stability_derivatives<F>(
    alpha: f64,
    u0: f64,
    density: f64,
    reference: &ReferenceDims,
    cog: &Point3,
    mut loads: F,
) -> StabilityDerivatives
where
    F: FnMut(&Vector3, &Vector3) -> (Vector3, Vector3),
{
    let axes = StabilityAxes::new(alpha.to_radians());
    // d[k][j]: derivative of component j (X, Y, Z, L, M, N) with respect to
    // state k (u, v, w, p, q, r).
    let mut d = [[0.0; 6]; 6];
    for (k, row) in d.iter_mut().enumerate() {
        let step = if k < 3 { VELOCITY_STEP } else { RATE_STEP };
        let mut state = [0.0; 6];
        state[k] = step;
        let (wind, rates) = axes.kinematics(u0, &state);
        let (f, m) = loads(&wind, &rates);
        let plus = axes.components(&f, &m);
        state[k] = -step;
        let (wind, rates) = axes.kinematics(u0, &state);
        let (f, m) = loads(&wind, &rates);
        let minus = axes.components(&f, &m);
        for (j, value) in row.iter_mut().enumerate() {
            *value = (plus[j] - minus[j]) / (2.0 * step);
        }
    }
    let (xu, zu, mu) = (d[0][0], d[0][2], d[0][4]);
    let (yv, lv, nv) = (d[1][1], d[1][3], d[1][5]);
    let (xw, zw, mw) = (d[2][0], d[2][2], d[2][4]);
    let (yp, lp, np) = (d[3][1], d[3][3], d[3][5]);
    let (xq, zq, mq) = (d[4][0], d[4][2], d[4][4]);
    let (yr, lr, nr) = (d[5][1], d[5][3], d[5][5]);

    let (s, b, c) = (reference.area, reference.span, reference.chord);
    let q = 0.5 * density * u0 * s;
    let h = 0.25 * density * u0 * s;
    let cma = mw / (q * c);
    let cza = zw / q;
    let neutral_point = if cza.abs() > f64::EPSILON {
        cog.x + cma / cza * c
    } else {
        cog.x
    };
    StabilityDerivatives {
        xu,
        zu,
        mu,
        yv,
        lv,
        nv,
        xw,
        zw,
        mw,
        yp,
        lp,
        np,
        xq,
        zq,
        mq,
        yr,
        lr,
        nr,
        cxu: xu / q,
        czu: zu / q,
        cmu: mu / (q * c),
        cyb: yv / q,
        clb: lv / (q * b),
        cnb: nv / (q * b),
        cxa: xw / q,
        cza,
        cma,
        cyp: yp / (h * b),
        clp: lp / (h * b * b),
        cnp: np / (h * b * b),
        cxq: xq / (h * c),
        czq: zq / (h * c),
        cmq: mq / (h * c * c),
        cyr: yr / (h * b),
        clr: lr / (h * b * b),
        cnr: nr / (h * b * b),
        neutral_point,
    }
}
