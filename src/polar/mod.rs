//! Analysis configuration and results: what to compute, and what came out.

mod condition;
mod snapshot;

pub use condition::OperatingCondition;
pub use snapshot::{PointStatus, SolutionSnapshot};

use crate::error::{AnalysisError, Result};
use crate::forces::{ExtraDrag, FuseDrag};
use crate::kernel::{DensityKind, GroundImage, KernelParams};
use crate::math::{Point3, TOLERANCE};
use crate::mesh::{PanelShapePolicy, ReferenceDims, WakeParams};

/// Analysis method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMethod {
    LiftingLine,
    /// Horseshoe-style vortex lattice; solved on the ring lattice.
    Vlm1,
    /// Ring vortex lattice.
    Vlm2,
    QuadPanel,
    TriUniform,
    TriLinear,
}

impl AnalysisMethod {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::LiftingLine => "lifting line",
            Self::Vlm1 => "VLM1",
            Self::Vlm2 => "VLM2",
            Self::QuadPanel => "quad panels",
            Self::TriUniform => "uniform triangles",
            Self::TriLinear => "linear triangles",
        }
    }

    #[must_use]
    pub fn panel_policy(self) -> PanelShapePolicy {
        match self {
            Self::TriUniform | Self::TriLinear => PanelShapePolicy::Triangles,
            _ => PanelShapePolicy::Quads,
        }
    }

    #[must_use]
    pub fn density(self) -> DensityKind {
        match self {
            Self::TriLinear => DensityKind::Linear,
            _ => DensityKind::Uniform,
        }
    }

    /// Lattice methods model every lifting part by its mean surface.
    #[must_use]
    pub fn is_lattice(self) -> bool {
        matches!(self, Self::Vlm1 | Self::Vlm2)
    }
}

/// Kind of sweep a polar performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarType {
    /// Listed conditions at their own speed.
    FixedSpeed,
    /// Listed conditions, speed set so that lift balances weight.
    FixedLift,
    /// Control values at a fixed condition.
    ControlSweep,
    /// Control values, each trimmed to zero pitching moment, with derivatives.
    Stability,
    /// Nested alpha, beta and speed ranges.
    Custom,
}

/// Inclusive range `min..=max` walked by `step`. A zero step or an empty
/// span yields the single value `min`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ValueRange {
    #[must_use]
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    #[must_use]
    pub fn single(value: f64) -> Self {
        Self::new(value, value, 0.0)
    }

    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        let span = self.max - self.min;
        if self.step.abs() < TOLERANCE || span.abs() < TOLERANCE || span.signum() != self.step.signum() {
            return vec![self.min];
        }
        let count = (span / self.step + 1e-9).floor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = count as usize;
        (0..=count)
            .map(|k| {
                #[allow(clippy::cast_precision_loss)]
                let k = k as f64;
                self.min + k * self.step
            })
            .collect()
    }
}

/// Operating points of a polar.
#[derive(Debug, Clone, PartialEq)]
pub enum Sweep {
    Conditions(Vec<OperatingCondition>),
    Controls {
        base: OperatingCondition,
        values: Vec<f64>,
    },
    Ranges {
        base: OperatingCondition,
        alpha: ValueRange,
        beta: ValueRange,
        speed: ValueRange,
    },
}

impl Sweep {
    /// Expanded `(condition, control value)` pairs, in evaluation order.
    #[must_use]
    pub fn points(&self) -> Vec<(OperatingCondition, f64)> {
        match self {
            Self::Conditions(list) => list.iter().map(|c| (*c, 0.0)).collect(),
            Self::Controls { base, values } => values.iter().map(|&v| (*base, v)).collect(),
            Self::Ranges {
                base,
                alpha,
                beta,
                speed,
            } => {
                let mut out = Vec::new();
                for a in alpha.values() {
                    for b in beta.values() {
                        for s in speed.values() {
                            out.push((base.with_alpha(a).with_beta(b).with_speed(s), 0.0));
                        }
                    }
                }
                out
            }
        }
    }
}

/// Where reference area, span and chord come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceMode {
    /// Derived from the first wing of the mesh.
    Auto,
    Manual(ReferenceDims),
}

/// Boundary-layer settings handed to the viscous correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViscousParams {
    /// Critical amplification factor of the transition criterion.
    pub ncrit: f64,
    /// Forced transition on the top surface, fraction of chord.
    pub xtr_top: f64,
    pub xtr_bottom: f64,
}

impl Default for ViscousParams {
    fn default() -> Self {
        Self {
            ncrit: 9.0,
            xtr_top: 1.0,
            xtr_bottom: 1.0,
        }
    }
}

/// Free-wake relaxation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxationParams {
    pub max_iterations: usize,
    /// Blend between the old and the re-traced wake, in `(0, 1]`.
    pub factor: f64,
    /// Convergence threshold on the largest node displacement, in reference chords.
    pub tolerance: f64,
}

impl Default for RelaxationParams {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            factor: 0.3,
            tolerance: 1e-3,
        }
    }
}

/// Lifting-line iteration settings. The iteration only runs when section
/// lift comes from polars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftingLineParams {
    pub max_iterations: usize,
    /// Fraction of the induced-angle update applied per iteration, in `(0, 1]`.
    pub factor: f64,
    /// Convergence threshold on the largest induced-angle update, degrees.
    pub tolerance: f64,
}

impl Default for LiftingLineParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            factor: 0.05,
            tolerance: 0.01,
        }
    }
}

/// Configuration of one polar. Read by the solver, never mutated by it.
#[derive(Debug, Clone)]
pub struct PolarSpec {
    pub name: String,
    pub polar_type: PolarType,
    pub method: AnalysisMethod,
    pub reference: ReferenceMode,
    /// Deflection gain of each part in degrees per unit control value, in
    /// part order. Empty means no control.
    pub controls: Vec<f64>,
    pub viscous: bool,
    pub viscous_params: ViscousParams,
    pub ground: Option<GroundImage>,
    pub density: f64,
    pub viscosity: f64,
    pub wake_panels: usize,
    pub wake_growth: f64,
    /// Total wake length in reference chords.
    pub wake_length_factor: f64,
    pub aligned_wake: bool,
    pub relaxation: Option<RelaxationParams>,
    pub lifting_line: LiftingLineParams,
    pub kernel: KernelParams,
    /// Aircraft mass, kg.
    pub mass: f64,
    /// Centre of gravity, also the moment and rotation reference.
    pub cog: Point3,
    pub extra_drag: Vec<ExtraDrag>,
    pub fuse_drag: Option<FuseDrag>,
    pub sweep: Sweep,
}

impl PolarSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, polar_type: PolarType, method: AnalysisMethod, sweep: Sweep) -> Self {
        Self {
            name: name.into(),
            polar_type,
            method,
            reference: ReferenceMode::Auto,
            controls: Vec::new(),
            viscous: false,
            viscous_params: ViscousParams::default(),
            ground: None,
            density: 1.225,
            viscosity: 1.5e-5,
            wake_panels: 5,
            wake_growth: 1.1,
            wake_length_factor: 30.0,
            aligned_wake: false,
            relaxation: None,
            lifting_line: LiftingLineParams::default(),
            kernel: KernelParams::default(),
            mass: 0.0,
            cog: Point3::origin(),
            extra_drag: Vec::new(),
            fuse_drag: None,
            sweep,
        }
    }

    /// Fixed-speed polar over angles of attack, in degrees.
    #[must_use]
    pub fn fixed_speed(name: impl Into<String>, method: AnalysisMethod, speed: f64, alphas: &[f64]) -> Self {
        let mut spec = Self::new(name, PolarType::FixedSpeed, method, Sweep::Conditions(Vec::new()));
        spec.sweep = Sweep::Conditions(alphas.iter().map(|&a| spec.condition(a, speed)).collect());
        spec
    }

    /// Condition at the polar's fluid properties.
    #[must_use]
    pub fn condition(&self, alpha: f64, speed: f64) -> OperatingCondition {
        OperatingCondition::new(alpha, speed).with_fluid(self.density, self.viscosity)
    }

    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceDims) -> Self {
        self.reference = ReferenceMode::Manual(reference);
        self
    }

    #[must_use]
    pub fn with_controls(mut self, gains: Vec<f64>) -> Self {
        self.controls = gains;
        self
    }

    #[must_use]
    pub fn with_mass(mut self, mass: f64, cog: Point3) -> Self {
        self.mass = mass;
        self.cog = cog;
        self
    }

    #[must_use]
    pub fn with_ground(mut self, ground: GroundImage) -> Self {
        self.ground = Some(ground);
        self
    }

    #[must_use]
    pub fn with_relaxation(mut self, relaxation: RelaxationParams) -> Self {
        self.relaxation = Some(relaxation);
        self
    }

    #[must_use]
    pub fn with_lifting_line(mut self, params: LiftingLineParams) -> Self {
        self.lifting_line = params;
        self
    }

    #[must_use]
    pub fn with_viscous(mut self, params: ViscousParams) -> Self {
        self.viscous = true;
        self.viscous_params = params;
        self
    }

    #[must_use]
    pub fn with_extra_drag(mut self, extra: Vec<ExtraDrag>) -> Self {
        self.extra_drag = extra;
        self
    }

    #[must_use]
    pub fn with_fuse_drag(mut self, fuse: FuseDrag) -> Self {
        self.fuse_drag = Some(fuse);
        self
    }

    /// Kernel settings with the polar's ground image applied.
    #[must_use]
    pub fn kernel_params(&self) -> KernelParams {
        KernelParams {
            ground: self.ground.or(self.kernel.ground),
            ..self.kernel
        }
    }

    /// Wake settings for a reference chord.
    #[must_use]
    pub fn wake_params(&self, chord: f64) -> WakeParams {
        WakeParams {
            panels: self.wake_panels,
            growth_factor: self.wake_growth,
            length: self.wake_length_factor * chord,
            aligned: self.aligned_wake,
        }
    }

    /// Checks the configuration against a plane with `parts` parts.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnsupportedMethod`] for a lifting-line
    /// stability polar, [`AnalysisError::ControlCountMismatch`] when the gain list
    /// does not match the part count, and [`AnalysisError::InvalidPolar`]
    /// for non-physical fluid, wake or mass settings or a sweep that does
    /// not fit the polar type.
    pub fn validate(&self, parts: usize) -> Result<()> {
        if self.method == AnalysisMethod::LiftingLine && self.polar_type == PolarType::Stability {
            return Err(AnalysisError::UnsupportedMethod {
                method: self.method.name(),
                polar: "stability",
            }
            .into());
        }
        if !self.controls.is_empty() && self.controls.len() != parts {
            return Err(AnalysisError::ControlCountMismatch {
                controls: self.controls.len(),
                parts,
            }
            .into());
        }
        let invalid = |reason: String| -> Result<()> { Err(AnalysisError::InvalidPolar(reason).into()) };
        if self.density <= 0.0 || self.viscosity <= 0.0 {
            return invalid(format!("density {} and viscosity {} must be positive", self.density, self.viscosity));
        }
        if self.wake_panels == 0 || self.wake_growth <= 0.0 || self.wake_length_factor <= 0.0 {
            return invalid("wake needs at least one panel, positive growth and length".into());
        }
        if let Some(relax) = &self.relaxation {
            if relax.max_iterations == 0 || !(relax.factor > 0.0 && relax.factor <= 1.0) || relax.tolerance <= 0.0 {
                return invalid("relaxation needs iterations, a factor in (0, 1] and a positive tolerance".into());
            }
        }
        let line = &self.lifting_line;
        if line.max_iterations == 0 || !(line.factor > 0.0 && line.factor <= 1.0) || line.tolerance <= 0.0 {
            return invalid("lifting line needs iterations, a factor in (0, 1] and a positive tolerance".into());
        }
        if let ReferenceMode::Manual(dims) = &self.reference {
            if dims.area <= 0.0 || dims.span <= 0.0 || dims.chord <= 0.0 {
                return invalid("reference dimensions must be positive".into());
            }
        }
        let needs_mass = matches!(self.polar_type, PolarType::FixedLift | PolarType::Stability);
        if needs_mass && self.mass <= 0.0 {
            return invalid(format!("{:?} polar needs a positive mass", self.polar_type));
        }
        let fits = matches!(
            (self.polar_type, &self.sweep),
            (PolarType::FixedSpeed | PolarType::FixedLift, Sweep::Conditions(_))
                | (PolarType::ControlSweep | PolarType::Stability, Sweep::Controls { .. })
                | (PolarType::Custom, Sweep::Ranges { .. })
        );
        if !fits {
            return invalid(format!("{:?} polar cannot run this sweep", self.polar_type));
        }
        self.kernel_params().validate()
    }
}

/// A polar configuration and the snapshots computed for it.
#[derive(Debug, Clone)]
pub struct Polar {
    pub spec: PolarSpec,
    pub results: Vec<SolutionSnapshot>,
}

impl Polar {
    #[must_use]
    pub fn new(spec: PolarSpec) -> Self {
        Self {
            spec,
            results: Vec::new(),
        }
    }

    /// Drops all computed snapshots.
    pub fn clear(&mut self) {
        self.results.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn range_values_are_inclusive() {
        assert_eq!(ValueRange::new(-2.0, 2.0, 1.0).values(), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(ValueRange::new(0.0, 0.3, 0.1).values().len(), 4);
        assert_eq!(ValueRange::single(3.0).values(), vec![3.0]);
        assert_eq!(ValueRange::new(0.0, 1.0, -0.5).values(), vec![0.0]);
    }

    #[test]
    fn vanishing_step_gives_single_value() {
        assert_eq!(ValueRange::new(1.0, 5.0, 1e-15).values(), vec![1.0]);
        assert_eq!(ValueRange::new(2.0, 2.0 + 1e-13, 0.5).values(), vec![2.0]);
    }

    #[test]
    fn ranges_expand_in_nested_order() {
        let sweep = Sweep::Ranges {
            base: OperatingCondition::default(),
            alpha: ValueRange::new(0.0, 1.0, 1.0),
            beta: ValueRange::single(0.0),
            speed: ValueRange::new(10.0, 30.0, 10.0),
        };
        let points = sweep.points();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].0.speed, 10.0);
        assert_eq!(points[3].0.alpha, 1.0);
    }

    #[test]
    fn lifting_line_runs_all_but_stability_polars() {
        let spec = PolarSpec::fixed_speed("ll", AnalysisMethod::LiftingLine, 10.0, &[0.0]);
        spec.validate(1).unwrap();
        let sweep = Sweep::Controls {
            base: OperatingCondition::default(),
            values: vec![0.0],
        };
        let stability = PolarSpec::new("ll", PolarType::Stability, AnalysisMethod::LiftingLine, sweep).with_mass(1.0, Point3::origin());
        assert!(matches!(
            stability.validate(1),
            Err(crate::PanelflowError::Analysis(AnalysisError::UnsupportedMethod { .. }))
        ));
        let frozen = spec.with_lifting_line(LiftingLineParams {
            factor: 0.0,
            ..LiftingLineParams::default()
        });
        assert!(frozen.validate(1).is_err());
    }

    #[test]
    fn control_count_must_match_parts() {
        let spec = PolarSpec::fixed_speed("c", AnalysisMethod::Vlm2, 10.0, &[0.0]).with_controls(vec![1.0, 2.0]);
        assert!(matches!(
            spec.validate(3),
            Err(crate::PanelflowError::Analysis(AnalysisError::ControlCountMismatch { controls: 2, parts: 3 }))
        ));
        spec.validate(2).unwrap();
    }

    #[test]
    fn sweep_must_fit_polar_type() {
        let mut spec = PolarSpec::fixed_speed("s", AnalysisMethod::QuadPanel, 10.0, &[0.0]);
        spec.polar_type = PolarType::ControlSweep;
        assert!(spec.validate(1).is_err());
        let stability = PolarSpec::new(
            "stab",
            PolarType::Stability,
            AnalysisMethod::Vlm2,
            Sweep::Controls {
                base: OperatingCondition::default(),
                values: vec![0.0],
            },
        );
        assert!(stability.validate(1).is_err());
        stability.with_mass(1.0, Point3::origin()).validate(1).unwrap();
    }
}
