//! Additive drag terms: extra drag items, fuselage friction and the viscous
//! profile-drag hook.

use crate::polar::ViscousParams;

/// A fixed drag item such as landing gear or an antenna.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraDrag {
    pub name: String,
    /// Reference area of the item, m².
    pub area: f64,
    pub cd: f64,
}

impl ExtraDrag {
    #[must_use]
    pub fn new(name: impl Into<String>, area: f64, cd: f64) -> Self {
        Self {
            name: name.into(),
            area,
            cd,
        }
    }
}

/// Drag coefficient of a list of extra items on reference area `area`.
#[must_use]
pub fn extra_drag_coefficient(items: &[ExtraDrag], area: f64) -> f64 {
    if area <= 0.0 {
        return 0.0;
    }
    items.iter().map(|e| e.area * e.cd).sum::<f64>() / area
}

/// Turbulent flat-plate skin friction law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrictionModel {
    KarmanSchoenherr,
    PrandtlSchlichting,
    /// Fixed friction coefficient.
    Manual(f64),
}

impl FrictionModel {
    /// Friction coefficient at Reynolds number `reynolds`.
    #[must_use]
    pub fn coefficient(&self, reynolds: f64) -> f64 {
        match *self {
            Self::Manual(cf) => cf,
            _ if reynolds <= 1.0 => 0.0,
            Self::PrandtlSchlichting => 0.455 * reynolds.log10().powf(-2.58),
            Self::KarmanSchoenherr => karman_schoenherr(reynolds),
        }
    }
}

/// Solves `0.242 / sqrt(Cf) = log10(Re Cf)` by Newton iteration from the
/// Schlichting power law.
fn karman_schoenherr(reynolds: f64) -> f64 {
    let mut cf = 0.074 / reynolds.powf(0.2);
    for _ in 0..100 {
        let root = cf.sqrt();
        let residual = 0.242 - root * (reynolds * cf).log10();
        let slope = 0.121 + root / std::f64::consts::LN_10;
        let step = residual / slope;
        cf *= 1.0 + step;
        if step.abs() < 1e-5 {
            break;
        }
    }
    cf
}

/// Friction drag of a fuselage: `FF · A_wet · Cf`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuseDrag {
    pub form_factor: f64,
    /// Body length for the Reynolds number, m.
    pub length: f64,
    /// Wetted area; `None` takes the paneled fuselage area.
    pub wetted_area: Option<f64>,
    pub model: FrictionModel,
}

impl FuseDrag {
    #[must_use]
    pub fn new(length: f64, model: FrictionModel) -> Self {
        Self {
            form_factor: 1.0,
            length,
            wetted_area: None,
            model,
        }
    }

    /// Drag area `FF · A_wet · Cf` at the given speed and kinematic viscosity.
    #[must_use]
    pub fn drag_area(&self, speed: f64, viscosity: f64, paneled_area: f64) -> f64 {
        let reynolds = speed * self.length / viscosity;
        let area = self.wetted_area.unwrap_or(paneled_area);
        self.form_factor * area * self.model.coefficient(reynolds)
    }
}

/// Profile drag supplied by a boundary-layer collaborator. It is added to
/// the inviscid drag and never fed back into the singularity solution.
pub trait ViscousCorrection: Send + Sync {
    /// Section profile drag coefficient at local lift coefficient `cl` and
    /// chord Reynolds number `reynolds`.
    fn profile_drag(&self, cl: f64, reynolds: f64, params: &ViscousParams) -> f64;

    /// Section lift coefficient at effective angle of attack `alpha`, in
    /// degrees, used by the lifting line. `None` when the collaborator has no
    /// lift polars, in which case thin-airfoil theory applies.
    fn lift_coefficient(&self, _alpha: f64, _reynolds: f64, _params: &ViscousParams) -> Option<f64> {
        None
    }
}

impl<F> ViscousCorrection for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn profile_drag(&self, cl: f64, reynolds: f64, _params: &ViscousParams) -> f64 {
        self(cl, reynolds)
    }
}
