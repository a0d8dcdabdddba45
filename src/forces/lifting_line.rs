//! Prandtl lifting line on the spanwise strips of the main wing.
//!
//! Every strip carries a horseshoe vortex bound on its quarter-chord line,
//! with trailing legs running aft from the strip edges. The linear problem
//! with thin-airfoil sections is solved directly. When the viscous
//! correction supplies lift polars, the induced angles are then relaxed
//! until section lift and circulation agree.

use std::f64::consts::PI;

use tracing::debug;

use crate::error::{AnalysisError, MeshError, Result};
use crate::math::{wind_axes, DMatrix, DVector, Point3, Vector3, FOUR_PI, GRAVITY, TOLERANCE};
use crate::mesh::{PanelMesh, PartKind, ReferenceDims, Strip};
use crate::polar::{LiftingLineParams, OperatingCondition, PointStatus};
use crate::solver::{relative_wind, FactorizedSystem, Strengths};
use crate::task::CancelToken;

use super::{extra_drag_coefficient, AeroCoefficients, DragModel, PointForces, SpanStation};

#[derive(Debug, Clone, Copy)]
struct Station {
    /// Quarter-chord edge points, `left.y <= right.y`.
    left: Point3,
    right: Point3,
    centre: Point3,
    /// Unit chord direction, leading to trailing edge.
    chord_axis: Vector3,
    normal: Vector3,
    chord: f64,
    area: f64,
}

impl Station {
    fn new(strip: &Strip) -> Result<Self> {
        let (left, right) = if strip.left.y <= strip.right.y {
            (strip.left, strip.right)
        } else {
            (strip.right, strip.left)
        };
        let degenerate = || MeshError::Degenerate("strip with zero chord or width".into());
        let chord_axis = (strip.trailing - strip.leading)
            .try_normalize(TOLERANCE)
            .ok_or_else(degenerate)?;
        let normal = chord_axis
            .cross(&(right - left))
            .try_normalize(TOLERANCE)
            .ok_or_else(degenerate)?;
        Ok(Self {
            left,
            right,
            centre: Point3::from((left.coords + right.coords) * 0.5),
            chord_axis,
            normal,
            chord: strip.chord,
            area: strip.area(),
        })
    }

    /// Velocity at `at` induced by the unit-strength trailing legs, seen in
    /// the cross-flow plane.
    fn trailing_velocity(&self, at: &Point3, core2: f64) -> Vector3 {
        let leg = |from: &Point3, axis: Vector3| {
            let rho = Vector3::new(0.0, at.y - from.y, at.z - from.z);
            axis.cross(&rho) / (FOUR_PI * (rho.norm_squared() + core2))
        };
        leg(&self.right, Vector3::x()) + leg(&self.left, -Vector3::x())
    }

    /// Angle between the local wind and the chord line, radians.
    fn geometric_angle(&self, wind: &Vector3) -> f64 {
        wind.dot(&self.normal).atan2(wind.dot(&self.chord_axis))
    }
}

/// A converged (or capped) lifting-line point.
#[derive(Debug, Clone)]
pub struct LiftingLinePoint {
    /// Condition as evaluated, with the balanced speed of a fixed-lift point.
    pub condition: OperatingCondition,
    /// Loads. Panel fields are empty and `wake_strengths` holds the station
    /// circulations.
    pub forces: PointForces,
    pub status: PointStatus,
}

/// Lifting-line model of the first wing of a mesh.
pub struct LiftingLine<'a> {
    stations: Vec<Station>,
    /// Normal wash at each station per unit circulation of each horseshoe.
    influence: DMatrix,
    system: FactorizedSystem,
    reference: ReferenceDims,
    cog: Point3,
    drag: DragModel<'a>,
    params: LiftingLineParams,
}

impl<'a> LiftingLine<'a> {
    /// Builds the stations from the strips of the mesh's first wing.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidPolar`] if the mesh has no wing,
    /// [`MeshError::Degenerate`] for a strip without chord or width, and any
    /// factorization error of the linear system.
    pub fn new(mesh: &PanelMesh, core_radius: f64) -> Result<Self> {
        let main = mesh
            .strips()
            .iter()
            .find(|s| s.kind == PartKind::Wing)
            .map(|s| s.part)
            .ok_or_else(|| AnalysisError::InvalidPolar("lifting line needs a wing".into()))?;
        let stations = mesh
            .strips()
            .iter()
            .filter(|s| s.part == main)
            .map(Station::new)
            .collect::<Result<Vec<_>>>()?;

        let n = stations.len();
        let core2 = core_radius * core_radius;
        let influence = DMatrix::from_fn(n, n, |k, m| {
            stations[k]
                .normal
                .dot(&stations[m].trailing_velocity(&stations[k].centre, core2))
        });
        // Γ_k - π c_k Σ A_km Γ_m = π c_k V_k α_k with a 2π lift slope.
        let matrix = DMatrix::from_fn(n, n, |k, m| {
            let identity = if k == m { 1.0 } else { 0.0 };
            identity - PI * stations[k].chord * influence[(k, m)]
        });
        let system = FactorizedSystem::new(matrix)?;
        debug!(stations = n, "lifting line built");

        Ok(Self {
            stations,
            influence,
            system,
            reference: mesh.reference_dims().unwrap_or_default(),
            cog: Point3::origin(),
            drag: DragModel::default(),
            params: LiftingLineParams::default(),
        })
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

    #[must_use]
    pub fn with_params(mut self, params: LiftingLineParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Solves one point. With `mass`, the speed is set so that lift balances
    /// its weight.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NonPositiveLift`] when a fixed-lift point
    /// has no positive lift, [`crate::error::SolverError::Cancelled`] when
    /// cancelled between iterations, and any solve error.
    pub fn solve(
        &self,
        condition: &OperatingCondition,
        mass: Option<f64>,
        cancel: Option<&CancelToken>,
    ) -> Result<LiftingLinePoint> {
        let mut condition = *condition;
        if let Some(mass) = mass {
            let unit = condition.with_speed(1.0);
            let winds = self.winds(&unit);
            let circulation = self.linear(&winds)?;
            let induced = self.induced_angles(&winds, &circulation);
            let cl = self.lift_coefficient(&unit, &winds, &circulation, &induced);
            condition = condition.with_speed(self.balance_speed(&condition, mass, cl)?);
        }

        let mut winds = self.winds(&condition);
        let mut circulation = self.linear(&winds)?;
        let mut induced = self.induced_angles(&winds, &circulation);
        let mut status = PointStatus::Converged;

        if self.drag.viscous.is_some() {
            status = PointStatus::NotConverged;
            for iteration in 1..=self.params.max_iterations {
                if let Some(token) = cancel {
                    token.check()?;
                }
                circulation = self.section_circulation(&condition, &winds, &induced);
                let target = self.induced_angles(&winds, &circulation);
                let mut largest: f64 = 0.0;
                for (angle, next) in induced.iter_mut().zip(&target) {
                    largest = largest.max((next - *angle).abs());
                    *angle += (next - *angle) * self.params.factor;
                }
                if let Some(mass) = mass {
                    let cl = self.lift_coefficient(&condition, &winds, &circulation, &induced);
                    condition = condition.with_speed(self.balance_speed(&condition, mass, cl)?);
                    winds = self.winds(&condition);
                }
                if largest.to_degrees() < self.params.tolerance {
                    debug!(iterations = iteration, "lifting line converged");
                    status = PointStatus::Converged;
                    break;
                }
            }
            circulation = self.section_circulation(&condition, &winds, &induced);
        }

        Ok(LiftingLinePoint {
            condition,
            forces: self.forces(&condition, &winds, &circulation, &induced),
            status,
        })
    }

    fn winds(&self, condition: &OperatingCondition) -> Vec<Vector3> {
        let freestream = condition.freestream();
        let rates = condition.rates();
        self.stations
            .iter()
            .map(|s| relative_wind(&freestream, &rates, &s.centre, &self.cog))
            .collect()
    }

    /// Circulation with thin-airfoil sections.
    fn linear(&self, winds: &[Vector3]) -> Result<Vec<f64>> {
        let rhs = DVector::from_iterator(
            self.stations.len(),
            self.stations
                .iter()
                .zip(winds)
                .map(|(s, wind)| PI * s.chord * wind.norm() * s.geometric_angle(wind)),
        );
        Ok(self.system.solve(&rhs)?.as_slice().to_vec())
    }

    /// Induced angle at each station, radians. Negative in downwash.
    fn induced_angles(&self, winds: &[Vector3], circulation: &[f64]) -> Vec<f64> {
        let wash = &self.influence * DVector::from_column_slice(circulation);
        wash.iter()
            .zip(winds)
            .map(|(w, wind)| {
                let speed = wind.norm();
                if speed > 0.0 {
                    w / speed
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Circulation from the section lift at the current induced angles.
    fn section_circulation(&self, condition: &OperatingCondition, winds: &[Vector3], induced: &[f64]) -> Vec<f64> {
        self.stations
            .iter()
            .zip(winds)
            .zip(induced)
            .map(|((s, wind), ai)| {
                let speed = wind.norm();
                let alpha = s.geometric_angle(wind) + ai;
                let reynolds = speed * s.chord / condition.viscosity;
                let cl = self
                    .drag
                    .viscous
                    .and_then(|(correction, params)| correction.lift_coefficient(alpha.to_degrees(), reynolds, &params))
                    .unwrap_or(2.0 * PI * alpha);
                0.5 * speed * s.chord * cl
            })
            .collect()
    }

    /// Kutta-Joukowski force of each bound segment in the induced wind.
    fn station_forces(&self, density: f64, winds: &[Vector3], circulation: &[f64], induced: &[f64]) -> Vec<Vector3> {
        self.stations
            .iter()
            .zip(winds)
            .zip(circulation.iter().zip(induced))
            .map(|((s, wind), (gamma, ai))| {
                let local = wind + s.normal * (ai * wind.norm());
                local.cross(&(s.right - s.left)) * (density * gamma)
            })
            .collect()
    }

    fn lift_coefficient(&self, condition: &OperatingCondition, winds: &[Vector3], circulation: &[f64], induced: &[f64]) -> f64 {
        let (_, _, lift_axis) = wind_axes(condition.alpha.to_radians(), condition.beta.to_radians());
        let lift: f64 = self
            .station_forces(condition.density, winds, circulation, induced)
            .iter()
            .map(|f| f.dot(&lift_axis))
            .sum();
        lift / (condition.dynamic_pressure() * self.reference.area)
    }

    fn balance_speed(&self, condition: &OperatingCondition, mass: f64, cl: f64) -> Result<f64> {
        if cl.is_nan() || cl <= 0.0 {
            return Err(AnalysisError::NonPositiveLift { cl }.into());
        }
        Ok((2.0 * mass * GRAVITY / (condition.density * self.reference.area * cl)).sqrt())
    }

    fn forces(&self, condition: &OperatingCondition, winds: &[Vector3], circulation: &[f64], induced: &[f64]) -> PointForces {
        let per_station = self.station_forces(condition.density, winds, circulation, induced);
        let mut force = Vector3::zeros();
        let mut moment = Vector3::zeros();
        let mut span = Vec::with_capacity(self.stations.len());
        let (mut induced_area, mut profile_area) = (0.0, 0.0);
        for (k, station) in self.stations.iter().enumerate() {
            force += per_station[k];
            moment += (station.centre - self.cog).cross(&per_station[k]);
            let speed = winds[k].norm();
            let cl = if speed * station.chord > 0.0 {
                2.0 * circulation[k] / (speed * station.chord)
            } else {
                0.0
            };
            let cd_induced = -cl * induced[k];
            let cd_profile = self.drag.viscous.map_or(0.0, |(correction, params)| {
                correction.profile_drag(cl, speed * station.chord / condition.viscosity, &params)
            });
            induced_area += cd_induced * station.area;
            profile_area += cd_profile * station.area;
            span.push(SpanStation {
                y: station.centre.y,
                chord: station.chord,
                circulation: circulation[k],
                cl,
                cd_induced,
                cd_profile,
            });
        }

        let ReferenceDims { area, span: b, chord } = self.reference;
        let qs = condition.dynamic_pressure() * area;
        let (drag_axis, side_axis, lift_axis) = wind_axes(condition.alpha.to_radians(), condition.beta.to_radians());
        let coefficient = |value: f64, length: f64| if qs > 0.0 { value / (qs * length) } else { 0.0 };
        let per_area = |value: f64| if area > 0.0 { value / area } else { 0.0 };

        let cdi_trefftz = per_area(induced_area);
        let cd_viscous = per_area(profile_area);
        let cd_extra = extra_drag_coefficient(self.drag.extra, area);
        // Bodies are not part of the lifting-line model; only a given wetted area counts.
        let cd_fuse = self
            .drag
            .fuse
            .map_or(0.0, |fuse| per_area(fuse.drag_area(condition.speed, condition.viscosity, 0.0)));
        let coefficients = AeroCoefficients {
            cl: coefficient(force.dot(&lift_axis), 1.0),
            cd: cdi_trefftz + cd_viscous + cd_extra + cd_fuse,
            cy: coefficient(force.dot(&side_axis), 1.0),
            cl_roll: coefficient(moment.x, b),
            cm: coefficient(moment.y, chord),
            cn: coefficient(moment.z, b),
            cdi_near: coefficient(force.dot(&drag_axis), 1.0),
            cdi_trefftz,
            cd_viscous,
            cd_extra,
            cd_fuse,
        };

        PointForces {
            strengths: Strengths {
                doublets: DVector::zeros(0),
                sources: DVector::zeros(0),
            },
            wake_strengths: circulation.to_vec(),
            cp: Vec::new(),
            velocities: Vec::new(),
            force,
            moment,
            coefficients,
            span,
        }
    }
}
