//! Pressure, forces, moments and drag from a superposed singularity solution.
//!
//! Thick panels are loaded by their surface pressure, thin panels by the
//! Kutta-Joukowski force on their bound vortex. Drag corrections are added
//! to the coefficients only and never fed back into the solution.

mod coefficients;
mod drag;
mod lifting_line;
mod pressure;
mod stability;
mod trefftz;
mod trim;

pub use coefficients::{AeroCoefficients, SpanStation};
pub use drag::{extra_drag_coefficient, ExtraDrag, FrictionModel, FuseDrag, ViscousCorrection};
pub use lifting_line::{LiftingLine, LiftingLinePoint};
pub use pressure::{bound_vortex_force, doublet_gradient, thick_panel_pressure, triangle_gradient};
pub use stability::{stability_derivatives, StabilityAxes, StabilityDerivatives, RATE_STEP, VELOCITY_STEP};
pub use trefftz::{trefftz_drag, TrefftzDrag};
pub use trim::TrimSolver;

use rayon::prelude::*;

use crate::kernel::{KernelParams, NodeAverage};
use crate::math::{wind_axes, Point3, Vector3};
use crate::mesh::{NeighborSlot, PanelMesh, PanelShape, PositionTag, ReferenceDims, WakeMesh};
use crate::polar::{OperatingCondition, PointStatus, SolutionSnapshot, ViscousParams};
use crate::solver::{dof_weights, relative_wind, KuttaMap, Strengths, UnitInducedVelocities, UnitSolutions};

/// Drag terms added on top of the inviscid solution.
#[derive(Clone, Copy, Default)]
pub struct DragModel<'a> {
    pub extra: &'a [ExtraDrag],
    pub fuse: Option<FuseDrag>,
    pub viscous: Option<(&'a dyn ViscousCorrection, ViscousParams)>,
}

/// Everything computed for one operating point.
#[derive(Debug, Clone)]
pub struct PointForces {
    pub strengths: Strengths,
    pub wake_strengths: Vec<f64>,
    pub cp: Vec<f64>,
    pub velocities: Vec<Vector3>,
    pub force: Vector3,
    pub moment: Vector3,
    pub coefficients: AeroCoefficients,
    pub span: Vec<SpanStation>,
}

impl PointForces {
    /// Packs the results into a snapshot without stability derivatives.
    #[must_use]
    pub fn into_snapshot(self, condition: OperatingCondition, control: f64, status: PointStatus) -> SolutionSnapshot {
        SolutionSnapshot {
            condition,
            control,
            doublets: self.strengths.doublets.as_slice().to_vec(),
            sources: self.strengths.sources.as_slice().to_vec(),
            wake_strengths: self.wake_strengths,
            cp: self.cp,
            velocities: self.velocities,
            force: self.force,
            moment: self.moment,
            coefficients: self.coefficients,
            span: self.span,
            stability: None,
            status,
        }
    }
}

/// Per-panel loads and their sums.
struct SurfaceLoads {
    cp: Vec<f64>,
    velocities: Vec<Vector3>,
    force: Vector3,
    moment: Vector3,
}

/// Integrates loads for any combination of the unit solutions it is given.
///
/// The unit solutions must have been computed with the rotation reference at
/// the centre of gravity passed to [`ForceMomentEngine::with_reference`].
pub struct ForceMomentEngine<'a> {
    mesh: &'a PanelMesh,
    wake: &'a WakeMesh,
    kutta: &'a KuttaMap,
    units: &'a UnitSolutions,
    induced: &'a UnitInducedVelocities,
    average: Option<&'a NodeAverage>,
    reference: ReferenceDims,
    cog: Point3,
    drag: DragModel<'a>,
    core_radius: f64,
    trefftz: bool,
    fuselage_area: f64,
}

impl<'a> ForceMomentEngine<'a> {
    #[must_use]
    pub fn new(
        mesh: &'a PanelMesh,
        wake: &'a WakeMesh,
        kutta: &'a KuttaMap,
        units: &'a UnitSolutions,
        induced: &'a UnitInducedVelocities,
    ) -> Self {
        let fuselage_area = mesh
            .panels()
            .iter()
            .filter(|p| p.position == PositionTag::Fuselage)
            .map(|p| p.area)
            .sum();
        Self {
            mesh,
            wake,
            kutta,
            units,
            induced,
            average: None,
            reference: mesh.reference_dims().unwrap_or_default(),
            cog: Point3::origin(),
            drag: DragModel::default(),
            core_radius: KernelParams::default().core_radius,
            trefftz: false,
            fuselage_area,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceDims, cog: Point3) -> Self {
        self.reference = reference;
        self.cog = cog;
        self
    }

    #[must_use]
    pub fn with_drag(mut self, drag: DragModel<'a>) -> Self {
        self.drag = drag;
        self
    }

    /// Uses the exact planar gradient of the node-averaged doublets on
    /// triangles.
    #[must_use]
    pub fn with_node_average(mut self, average: &'a NodeAverage) -> Self {
        self.average = Some(average);
        self
    }

    #[must_use]
    pub fn with_core_radius(mut self, core_radius: f64) -> Self {
        self.core_radius = core_radius;
        self
    }

    /// Takes the induced drag from the Trefftz plane instead of the surface
    /// force integral.
    #[must_use]
    pub fn with_trefftz(mut self, trefftz: bool) -> Self {
        self.trefftz = trefftz;
        self
    }

    #[must_use]
    pub fn reference(&self) -> &ReferenceDims {
        &self.reference
    }

    #[must_use]
    pub fn cog(&self) -> &Point3 {
        &self.cog
    }

    /// Body-axis force and moment about the centre of gravity for a
    /// body-axis freestream and body rates.
    #[must_use]
    pub fn loads(&self, freestream: &Vector3, rates: &Vector3, density: f64) -> (Vector3, Vector3) {
        let strengths = self.units.combine(&dof_weights(freestream, rates));
        let surface = self.surface_loads(freestream, rates, density, &strengths);
        (surface.force, surface.moment)
    }

    /// Pitching moment coefficient at `alpha` degrees, at unit speed.
    #[must_use]
    pub fn pitching_moment(&self, condition: &OperatingCondition, alpha: f64) -> f64 {
        let unit = condition.with_alpha(alpha).with_speed(1.0);
        let (_, moment) = self.loads(&unit.freestream(), &unit.rates(), unit.density);
        let qsc = unit.dynamic_pressure() * self.reference.area * self.reference.chord;
        if qsc > 0.0 {
            moment.y / qsc
        } else {
            0.0
        }
    }

    /// Solves and integrates one operating point.
    #[must_use]
    pub fn evaluate(&self, condition: &OperatingCondition) -> PointForces {
        let freestream = condition.freestream();
        let rates = condition.rates();
        let strengths = self.units.combine(&dof_weights(&freestream, &rates));
        let wake_strengths = self.kutta.column_strengths(strengths.doublets.as_slice());
        let surface = self.surface_loads(&freestream, &rates, condition.density, &strengths);

        let trefftz = trefftz_drag(self.wake, &wake_strengths, &freestream, condition.density, self.core_radius);
        let (span, cd_viscous) = self.span_loading(condition, &wake_strengths, &trefftz.downwash);

        let ReferenceDims { area, span: b, chord } = self.reference;
        let qs = condition.dynamic_pressure() * area;
        let (drag_axis, side_axis, lift_axis) = wind_axes(condition.alpha.to_radians(), condition.beta.to_radians());
        let coefficient = |value: f64, length: f64| if qs > 0.0 { value / (qs * length) } else { 0.0 };

        let cdi_near = coefficient(surface.force.dot(&drag_axis), 1.0);
        let cdi_trefftz = coefficient(trefftz.drag, 1.0);
        let cd_extra = extra_drag_coefficient(self.drag.extra, area);
        let cd_fuse = self.drag.fuse.map_or(0.0, |fuse| {
            if area > 0.0 {
                fuse.drag_area(condition.speed, condition.viscosity, self.fuselage_area) / area
            } else {
                0.0
            }
        });
        let cdi = if self.trefftz { cdi_trefftz } else { cdi_near };
        let coefficients = AeroCoefficients {
            cl: coefficient(surface.force.dot(&lift_axis), 1.0),
            cd: cdi + cd_viscous + cd_extra + cd_fuse,
            cy: coefficient(surface.force.dot(&side_axis), 1.0),
            cl_roll: coefficient(surface.moment.x, b),
            cm: coefficient(surface.moment.y, chord),
            cn: coefficient(surface.moment.z, b),
            cdi_near,
            cdi_trefftz,
            cd_viscous,
            cd_extra,
            cd_fuse,
        };
        PointForces {
            strengths,
            wake_strengths,
            cp: surface.cp,
            velocities: surface.velocities,
            force: surface.force,
            moment: surface.moment,
            coefficients,
            span,
        }
    }

    fn surface_loads(&self, freestream: &Vector3, rates: &Vector3, density: f64, strengths: &Strengths) -> SurfaceLoads {
        let nodes = self.mesh.nodes();
        let panels = self.mesh.panels();
        let doublets = strengths.doublets.as_slice();
        let weights = dof_weights(freestream, rates);
        let speed = freestream.norm();
        let q = 0.5 * density * speed * speed;

        let per_panel: Vec<(f64, Vector3, Vector3, Vector3)> = (0..panels.len())
            .into_par_iter()
            .map(|i| {
                let panel = &panels[i];
                if panel.is_thin() {
                    let Some((a, b)) = panel.front_segment(nodes) else {
                        return (0.0, Vector3::zeros(), Vector3::zeros(), Vector3::zeros());
                    };
                    let mid = Point3::from((a.coords + b.coords) * 0.5);
                    let induced = self.induced.at_panel(i, &weights).unwrap_or_else(Vector3::zeros);
                    let local = relative_wind(freestream, rates, &mid, &self.cog) + induced;
                    let upstream = panel
                        .neighbor(NeighborSlot::Upstream)
                        .filter(|&j| panels[j].is_thin())
                        .map_or(0.0, |j| doublets[j]);
                    let force = bound_vortex_force(density, doublets[i] - upstream, &local, &a, &b);
                    let cp = if q * panel.area > 0.0 {
                        force.dot(&panel.normal) / (q * panel.area)
                    } else {
                        0.0
                    };
                    (cp, local, force, (mid - self.cog).cross(&force))
                } else {
                    let wind = relative_wind(freestream, rates, &panel.collocation, &self.cog);
                    let gradient = match self.average {
                        Some(average) if panel.shape == PanelShape::Triangle => {
                            let values = [0, 1, 2].map(|k| average.node_value(i, k, doublets));
                            triangle_gradient(&panel.vertices(nodes), values, &panel.normal, panel.area)
                        }
                        _ => doublet_gradient(self.mesh, i, doublets),
                    };
                    let (velocity, cp) = thick_panel_pressure(&panel.normal, &wind, &gradient, speed);
                    let force = -panel.normal * (cp * q * panel.area);
                    (cp, velocity, force, (panel.collocation - self.cog).cross(&force))
                }
            })
            .collect();

        let mut loads = SurfaceLoads {
            cp: Vec::with_capacity(per_panel.len()),
            velocities: Vec::with_capacity(per_panel.len()),
            force: Vector3::zeros(),
            moment: Vector3::zeros(),
        };
        for (cp, velocity, force, moment) in per_panel {
            loads.cp.push(cp);
            loads.velocities.push(velocity);
            loads.force += force;
            loads.moment += moment;
        }
        loads
    }

    /// Span stations in wake column order and the viscous drag coefficient.
    fn span_loading(&self, condition: &OperatingCondition, wake_strengths: &[f64], downwash: &[f64]) -> (Vec<SpanStation>, f64) {
        let speed = condition.speed;
        let strips = self.mesh.strips();
        let mut stations = Vec::new();
        let mut profile_area = 0.0;
        for (c, column) in self.wake.columns().iter().enumerate() {
            let Some(strip) = column.strip.and_then(|k| strips.get(k)) else {
                continue;
            };
            let gamma = wake_strengths[c];
            let chord = strip.chord;
            let (cl, cd_induced) = if speed > 0.0 && chord > 0.0 {
                (2.0 * gamma / (speed * chord), -gamma * downwash[c] / (speed * speed * chord))
            } else {
                (0.0, 0.0)
            };
            let cd_profile = self.drag.viscous.map_or(0.0, |(correction, params)| {
                correction.profile_drag(cl, speed * chord / condition.viscosity, &params)
            });
            profile_area += cd_profile * strip.area();
            stations.push(SpanStation {
                y: strip.quarter_chord().y,
                chord,
                circulation: gamma,
                cl,
                cd_induced,
                cd_profile,
            });
        }
        let cd_viscous = if self.reference.area > 0.0 {
            profile_area / self.reference.area
        } else {
            0.0
        };
        (stations, cd_viscous)
    }
}
