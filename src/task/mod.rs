//! Analysis task: runs a polar on a worker thread, one operating point at a
//! time, reusing factorized systems between points that share control
//! deflections.

mod context;
mod progress;
mod relax;
mod session;
mod state;

pub use context::{CancelToken, TaskContext};
pub use progress::{ProgressQueue, ProgressReceiver, ProgressReport};
pub use session::SolverSession;
pub use state::TaskState;

pub(crate) use state::StateCell;

use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{error, info, warn};

use crate::error::{AnalysisError, PanelflowError, Result, SolverError};
use crate::forces::{
    stability_derivatives, DragModel, ForceMomentEngine, LiftingLine, TrimSolver, ViscousCorrection,
};
use crate::math::{wind_axes, GRAVITY, TOLERANCE};
use crate::mesh::{BuildPanelMesh, GenerateWake, PanelMesh, PanelShapePolicy, PartStore, ReferenceDims};
use crate::polar::{
    AnalysisMethod, OperatingCondition, Polar, PolarSpec, PolarType, PointStatus, ReferenceMode,
    SolutionSnapshot,
};

use relax::{relax_wake, RelaxationMonitor};

/// Synchronous per-point callbacks, invoked on the worker thread.
pub trait TaskListener: Send + Sync {
    fn point_finished(&self, _index: usize, _snapshot: &SolutionSnapshot) {}

    fn point_failed(&self, _index: usize, _error: &PanelflowError) {}
}

/// Outcome of a task run.
#[derive(Debug)]
pub struct TaskReport {
    /// The polar with the computed snapshots appended.
    pub polar: Polar,
    pub state: TaskState,
    /// Progress reports discarded because the consumer fell behind.
    pub dropped: u64,
    /// The error that made the task fatal.
    pub error: Option<PanelflowError>,
}

/// A polar analysis over a set of parts.
///
/// The parts are shared read-only; deflected variants are private copies
/// made by the worker.
pub struct AnalysisTask {
    store: Arc<PartStore>,
    polar: Polar,
    context: TaskContext,
    listener: Option<Arc<dyn TaskListener>>,
    viscous: Option<Arc<dyn ViscousCorrection>>,
    state: StateCell,
    queue: ProgressQueue,
    receiver: ProgressReceiver,
}

impl AnalysisTask {
    #[must_use]
    pub fn new(store: Arc<PartStore>, polar: Polar) -> Self {
        let context = TaskContext::default();
        let (queue, receiver) = ProgressQueue::bounded(context.queue_capacity);
        Self {
            store,
            polar,
            context,
            listener: None,
            viscous: None,
            state: StateCell::new(),
            queue,
            receiver,
        }
    }

    /// Replaces the run-time settings. The progress queue is recreated with
    /// the new capacity, so receivers taken earlier see nothing.
    #[must_use]
    pub fn with_context(mut self, context: TaskContext) -> Self {
        let (queue, receiver) = ProgressQueue::bounded(context.queue_capacity);
        self.context = context;
        self.queue = queue;
        self.receiver = receiver;
        self
    }

    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TaskListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Profile drag source for polars with viscous analysis enabled.
    #[must_use]
    pub fn with_viscous(mut self, correction: Arc<dyn ViscousCorrection>) -> Self {
        self.viscous = Some(correction);
        self
    }

    #[must_use]
    pub fn progress(&self) -> ProgressReceiver {
        self.receiver.clone()
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.context.cancel.clone()
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    /// Runs the polar on the calling thread.
    #[must_use]
    pub fn run(self) -> TaskReport {
        self.state.set(TaskState::Running);
        info!(
            polar = %self.polar.spec.name,
            method = self.polar.spec.method.name(),
            "analysis started"
        );
        let mut results = Vec::new();
        let outcome = self.execute(&mut results);
        let (state, error) = match outcome {
            Ok(has_errors) => (TaskState::Finished { has_errors }, None),
            Err(e) if e.is_cancelled() => (TaskState::Cancelled, None),
            Err(e) => {
                error!(error = %e, "analysis aborted");
                self.queue.log(format!("analysis aborted: {e}"));
                (TaskState::Fatal, Some(e))
            }
        };
        self.state.set(state);
        info!(?state, points = results.len(), "analysis ended");
        self.queue.close();

        let Self { mut polar, queue, .. } = self;
        polar.results.extend(results);
        TaskReport {
            polar,
            state,
            dropped: queue.dropped(),
            error,
        }
    }

    /// Runs the polar on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ThreadPool`] if the thread cannot be spawned.
    pub fn spawn(self) -> Result<TaskHandle> {
        let cancel = self.context.cancel.clone();
        let state = self.state.clone();
        let progress = self.receiver.clone();
        let thread = std::thread::Builder::new()
            .name(format!("panelflow-{}", self.polar.spec.name))
            .spawn(move || self.run())
            .map_err(|e| SolverError::ThreadPool(e.to_string()))?;
        Ok(TaskHandle {
            thread,
            cancel,
            state,
            progress,
        })
    }

    /// Sweeps every point, returning whether any of them failed.
    fn execute(&self, results: &mut Vec<SolutionSnapshot>) -> Result<bool> {
        let spec = &self.polar.spec;
        spec.validate(self.store.len())?;
        if spec.viscous && self.viscous.is_none() {
            return Err(AnalysisError::InvalidPolar("viscous analysis needs a viscous correction".into()).into());
        }
        if spec.method == AnalysisMethod::LiftingLine {
            return self.sweep_lifting_line(spec, results);
        }
        let pool = self.context.thread_pool()?;
        pool.install(|| self.sweep(spec, results))
    }

    /// Lifting-line sweep. The model is rebuilt whenever the control
    /// deflections change.
    fn sweep_lifting_line(&self, spec: &PolarSpec, results: &mut Vec<SolutionSnapshot>) -> Result<bool> {
        let cancel = &self.context.cancel;
        let build = |deflections: Vec<f64>| {
            BuildPanelMesh::new(&self.store, PanelShapePolicy::Quads)
                .with_deflections(deflections)
                .thin_surfaces_only(true)
                .execute()
        };
        let canonical = build(Vec::new())?;
        let reference = reference_dims(spec, &canonical)?;
        let line = |mesh: &PanelMesh| {
            LiftingLine::new(mesh, spec.kernel.core_radius).map(|model| {
                model
                    .with_reference(reference, spec.cog)
                    .with_drag(self.drag_model(spec))
                    .with_params(spec.lifting_line)
            })
        };
        let mut canonical = Some(line(&canonical)?);
        let mass = (spec.polar_type == PolarType::FixedLift).then_some(spec.mass);

        let mut cached: Option<(Vec<f64>, LiftingLine<'_>)> = None;
        let mut has_errors = false;
        for (index, (condition, control)) in spec.sweep.points().into_iter().enumerate() {
            cancel.check()?;
            let deflections: Vec<f64> = spec.controls.iter().map(|gain| gain * control).collect();
            if !matches!(&cached, Some((current, _)) if *current == deflections) {
                cached = None;
                let model = match canonical.take() {
                    Some(model) if deflections.iter().all(|d| d.abs() < TOLERANCE) => Ok(model),
                    _ => build(deflections.clone()).and_then(|mesh| line(&mesh)),
                };
                match model {
                    Ok(model) => cached = Some((deflections, model)),
                    Err(e) if e.is_point_local() => {
                        has_errors = true;
                        self.point_failed(index, &e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            let Some((_, model)) = cached.as_ref() else {
                continue;
            };
            match model.solve(&condition, mass, Some(cancel)) {
                Ok(point) => {
                    let snapshot = point.forces.into_snapshot(point.condition, control, point.status);
                    has_errors |= !self.point_solved(index, snapshot, results);
                }
                Err(e) if e.is_point_local() => {
                    has_errors = true;
                    self.point_failed(index, &e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(has_errors)
    }

    fn sweep(&self, spec: &PolarSpec, results: &mut Vec<SolutionSnapshot>) -> Result<bool> {
        let cancel = &self.context.cancel;
        let lattice = spec.method.is_lattice();
        let build = |deflections: Vec<f64>| {
            BuildPanelMesh::new(&self.store, spec.method.panel_policy())
                .with_deflections(deflections)
                .thin_surfaces_only(lattice)
                .execute()
        };

        let canonical_mesh = build(Vec::new())?;
        let reference = reference_dims(spec, &canonical_mesh)?;
        let mut canonical = Some(canonical_mesh);

        let points = spec.sweep.points();
        let mut cached: Option<(Vec<f64>, SolverSession)> = None;
        let mut has_errors = false;
        for (index, (condition, control)) in points.into_iter().enumerate() {
            cancel.check()?;
            let deflections: Vec<f64> = spec.controls.iter().map(|gain| gain * control).collect();
            if !matches!(&cached, Some((current, _)) if *current == deflections) {
                cached = None;
                let mesh = match canonical.take() {
                    Some(mesh) if deflections.iter().all(|d| d.abs() < TOLERANCE) => mesh,
                    _ => build(deflections.clone())?,
                };
                let wake = GenerateWake::new(&mesh, spec.wake_params(reference.chord)).execute()?;
                match SolverSession::build(mesh, wake, spec.method.density(), spec.kernel_params(), spec.cog, Some(cancel)) {
                    Ok(session) => cached = Some((deflections, session)),
                    Err(e) if e.is_point_local() => {
                        has_errors = true;
                        self.point_failed(index, &e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            let Some((_, session)) = cached.as_mut() else {
                continue;
            };

            match self.solve_point(spec, session, reference, index, condition, control) {
                Ok(snapshot) => has_errors |= !self.point_solved(index, snapshot, results),
                Err(e) if e.is_point_local() => {
                    has_errors = true;
                    self.point_failed(index, &e);
                }
                Err(e) => return Err(e),
            }
            self.state.set(TaskState::Running);
        }
        Ok(has_errors)
    }

    /// Reports and stores a solved point, returning whether it converged.
    fn point_solved(&self, index: usize, snapshot: SolutionSnapshot, results: &mut Vec<SolutionSnapshot>) -> bool {
        let converged = snapshot.is_converged();
        let c = &snapshot.coefficients;
        info!(
            point = index,
            alpha = snapshot.condition.alpha,
            speed = snapshot.condition.speed,
            cl = c.cl,
            cd = c.cd,
            cm = c.cm,
            "point solved"
        );
        self.queue.log(format!(
            "point {index}: alpha {:.3} V {:.3} CL {:.5} CD {:.5} Cm {:.5}",
            snapshot.condition.alpha, snapshot.condition.speed, c.cl, c.cd, c.cm
        ));
        if let Some(listener) = &self.listener {
            listener.point_finished(index, &snapshot);
        }
        self.queue.push(ProgressReport::PointFinished { point: index, converged });
        results.push(snapshot);
        converged
    }

    fn point_failed(&self, index: usize, error: &PanelflowError) {
        warn!(point = index, error = %error, "point skipped");
        self.queue.log(format!("point {index} skipped: {error}"));
        if let Some(listener) = &self.listener {
            listener.point_failed(index, error);
        }
    }

    fn drag_model<'a>(&'a self, spec: &'a PolarSpec) -> DragModel<'a> {
        let viscous = self
            .viscous
            .as_deref()
            .filter(|_| spec.viscous)
            .map(|correction| (correction, spec.viscous_params));
        DragModel {
            extra: &spec.extra_drag,
            fuse: spec.fuse_drag,
            viscous,
        }
    }

    fn engine<'a>(&'a self, spec: &'a PolarSpec, session: &'a SolverSession, reference: ReferenceDims) -> ForceMomentEngine<'a> {
        session
            .engine()
            .with_reference(reference, spec.cog)
            .with_drag(self.drag_model(spec))
            .with_trefftz(spec.method.is_lattice() || !session.mesh().has_thick_panels())
    }

    fn solve_point(
        &self,
        spec: &PolarSpec,
        session: &mut SolverSession,
        reference: ReferenceDims,
        index: usize,
        condition: OperatingCondition,
        control: f64,
    ) -> Result<SolutionSnapshot> {
        if spec.relaxation.is_some() {
            session.reset_wake(Some(&self.context.cancel))?;
        }
        let condition = {
            let engine = self.engine(spec, session, reference);
            match spec.polar_type {
                PolarType::FixedSpeed | PolarType::ControlSweep | PolarType::Custom => condition,
                PolarType::FixedLift => condition.with_speed(balance_speed(&engine, &condition, spec.mass)?),
                PolarType::Stability => {
                    let alpha = TrimSolver::default().solve(control, |a| Ok(engine.pitching_moment(&condition, a)))?;
                    let trimmed = condition.with_alpha(alpha);
                    trimmed.with_speed(balance_speed(&engine, &trimmed, spec.mass)?)
                }
            }
        };

        let status = match &spec.relaxation {
            Some(params) => {
                let monitor = RelaxationMonitor {
                    point: index,
                    state: &self.state,
                    cancel: &self.context.cancel,
                    progress: self.context.live_update.then_some(&self.queue),
                };
                relax_wake(session, &condition, params, reference.chord, &monitor)?
            }
            None => PointStatus::Converged,
        };

        let engine = self.engine(spec, session, reference);
        let mut snapshot = engine.evaluate(&condition).into_snapshot(condition, control, status);
        if spec.polar_type == PolarType::Stability {
            snapshot.stability = Some(stability_derivatives(
                condition.alpha,
                condition.speed,
                condition.density,
                &reference,
                &spec.cog,
                |wind, rates| engine.loads(wind, rates, condition.density),
            ));
        }
        Ok(snapshot)
    }
}

/// Manual reference dimensions, or those of the mesh's first wing.
fn reference_dims(spec: &PolarSpec, mesh: &PanelMesh) -> Result<ReferenceDims> {
    match spec.reference {
        ReferenceMode::Manual(dims) => Ok(dims),
        ReferenceMode::Auto => mesh
            .reference_dims()
            .ok_or_else(|| AnalysisError::InvalidPolar("no wing to take reference dimensions from".into()).into()),
    }
}

/// Speed at which lift balances the weight of `mass`, from the lift
/// coefficient at unit speed.
fn balance_speed(engine: &ForceMomentEngine<'_>, condition: &OperatingCondition, mass: f64) -> Result<f64> {
    let unit = condition.with_speed(1.0);
    let (force, _) = engine.loads(&unit.freestream(), &unit.rates(), unit.density);
    let (_, _, lift_axis) = wind_axes(unit.alpha.to_radians(), unit.beta.to_radians());
    let area = engine.reference().area;
    let cl = force.dot(&lift_axis) / (unit.dynamic_pressure() * area);
    if cl.is_nan() || cl <= 0.0 {
        return Err(AnalysisError::NonPositiveLift { cl }.into());
    }
    Ok((2.0 * mass * GRAVITY / (unit.density * area * cl)).sqrt())
}

/// Handle on a spawned task.
pub struct TaskHandle {
    thread: JoinHandle<TaskReport>,
    cancel: CancelToken,
    state: StateCell,
    progress: ProgressReceiver,
}

impl TaskHandle {
    /// Requests a cooperative stop; the worker finishes its current block.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    #[must_use]
    pub fn progress(&self) -> ProgressReceiver {
        self.progress.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the worker.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::WorkerPanicked`] if the worker panicked.
    pub fn join(self) -> Result<TaskReport> {
        self.thread
            .join()
            .map_err(|_| AnalysisError::WorkerPanicked.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::MeshError;
    use crate::math::Point3;
    use crate::mesh::{Part, PartKind, SurfaceGrid, SurfaceKind};
    use crate::polar::{AnalysisMethod, RelaxationParams, Sweep};
    use crate::testing::{init_tracing, plate_store};
    use approx::assert_relative_eq;

    fn small_plate() -> Arc<PartStore> {
        Arc::new(plate_store(1.0, 6.0, 2, 4))
    }

    #[derive(Default)]
    struct Recorder {
        finished: AtomicUsize,
        failed: AtomicUsize,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl TaskListener for Recorder {
        fn point_finished(&self, _index: usize, _snapshot: &SolutionSnapshot) {
            let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((after, token)) = &self.cancel_after {
                if done == *after {
                    token.cancel();
                }
            }
        }

        fn point_failed(&self, _index: usize, _error: &PanelflowError) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancellation_after_third_point_keeps_three_snapshots() {
        init_tracing();
        let alphas: Vec<f64> = (0..20).map(f64::from).collect();
        let spec = PolarSpec::fixed_speed("sweep", AnalysisMethod::Vlm2, 20.0, &alphas);
        let task = AnalysisTask::new(small_plate(), Polar::new(spec));
        let recorder = Arc::new(Recorder {
            cancel_after: Some((3, task.cancel_token())),
            ..Recorder::default()
        });
        let progress = task.progress();
        let report = task.with_listener(recorder.clone()).run();
        assert_eq!(report.state, TaskState::Cancelled);
        assert!(report.error.is_none());
        assert_eq!(report.polar.results.len(), 3);
        assert_eq!(recorder.finished.load(Ordering::SeqCst), 3);
        let finished = progress
            .drain()
            .into_iter()
            .filter(|r| matches!(r, ProgressReport::PointFinished { .. }))
            .count();
        assert_eq!(finished, 3);
        assert!(progress.is_closed());
    }

    #[test]
    fn part_without_panels_is_fatal_before_any_point() {
        let mut store = plate_store(1.0, 6.0, 2, 4);
        store.insert(Part::new("empty", PartKind::Wing, SurfaceKind::Thin, Vec::new()));
        let spec = PolarSpec::fixed_speed("bad", AnalysisMethod::Vlm2, 20.0, &[0.0, 2.0]);
        let recorder = Arc::new(Recorder::default());
        let report = AnalysisTask::new(Arc::new(store), Polar::new(spec))
            .with_listener(recorder.clone())
            .run();
        assert_eq!(report.state, TaskState::Fatal);
        assert!(matches!(report.error, Some(PanelflowError::Mesh(MeshError::Degenerate(_)))));
        assert!(report.polar.results.is_empty());
        assert_eq!(recorder.finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn viscous_polar_without_correction_is_fatal() {
        let spec = PolarSpec::fixed_speed("visc", AnalysisMethod::Vlm2, 20.0, &[2.0])
            .with_viscous(crate::polar::ViscousParams::default());
        let report = AnalysisTask::new(small_plate(), Polar::new(spec)).run();
        assert_eq!(report.state, TaskState::Fatal);
        assert!(matches!(report.error, Some(PanelflowError::Analysis(AnalysisError::InvalidPolar(_)))));
    }

    #[test]
    fn fixed_lift_balances_weight_and_flags_negative_lift() {
        init_tracing();
        let mass = 2.0;
        let mut spec = PolarSpec::fixed_speed("t2", AnalysisMethod::Vlm2, 10.0, &[-2.0, 4.0]);
        spec.polar_type = PolarType::FixedLift;
        let spec = spec.with_mass(mass, Point3::new(0.25, 0.0, 0.0));
        let recorder = Arc::new(Recorder::default());
        let report = AnalysisTask::new(small_plate(), Polar::new(spec))
            .with_listener(recorder.clone())
            .run();
        assert_eq!(report.state, TaskState::Finished { has_errors: true });
        assert_eq!(recorder.failed.load(Ordering::SeqCst), 1);
        assert_eq!(report.polar.results.len(), 1);
        let snapshot = &report.polar.results[0];
        assert_relative_eq!(snapshot.condition.alpha, 4.0);
        let (_, _, lift_axis) = wind_axes(4.0_f64.to_radians(), 0.0);
        assert_relative_eq!(snapshot.force.dot(&lift_axis), mass * GRAVITY, max_relative = 1e-9);
    }

    #[test]
    fn stability_polar_trims_wing_and_tail() {
        let mut tail = SurfaceGrid::flat_plate(0.5, 2.0, 2, 4);
        for p in tail.points_mut() {
            p.x += 3.0;
            p.z += 0.3;
        }
        let mut store = plate_store(1.0, 6.0, 3, 8);
        store.insert(Part::new("elevator", PartKind::Wing, SurfaceKind::Thin, vec![tail]));

        let cog = Point3::new(0.35, 0.0, 0.0);
        let base = OperatingCondition::new(0.0, 10.0);
        let spec = PolarSpec::new(
            "t7",
            PolarType::Stability,
            AnalysisMethod::Vlm2,
            Sweep::Controls {
                base,
                values: vec![-1.5],
            },
        )
        .with_controls(vec![0.0, 1.0])
        .with_mass(2.0, cog);
        let report = AnalysisTask::new(Arc::new(store), Polar::new(spec)).run();
        assert_eq!(report.state, TaskState::Finished { has_errors: false });
        let snapshot = &report.polar.results[0];
        assert!(snapshot.condition.alpha > 0.0, "trimmed at {}", snapshot.condition.alpha);
        assert!(snapshot.coefficients.cl > 0.0);
        assert!(snapshot.coefficients.cm.abs() < 1e-4);
        let derivatives = snapshot.stability.as_ref().unwrap();
        assert!(derivatives.cma < 0.0);
        assert!(derivatives.neutral_point > cog.x && derivatives.neutral_point < 1.5);
    }

    #[test]
    fn relaxation_publishes_wake_snapshots() {
        let spec = PolarSpec::fixed_speed("free", AnalysisMethod::Vlm2, 10.0, &[5.0]).with_relaxation(RelaxationParams {
            max_iterations: 3,
            factor: 0.5,
            tolerance: 1e-3,
        });
        let task = AnalysisTask::new(small_plate(), Polar::new(spec))
            .with_context(TaskContext::default().with_live_update(true).with_max_threads(2));
        let progress = task.progress();
        let report = task.run();
        assert_eq!(report.polar.results.len(), 1);
        let converged = report.polar.results[0].is_converged();
        assert_eq!(report.state, TaskState::Finished { has_errors: !converged });
        let wakes = progress
            .drain()
            .into_iter()
            .filter(|r| matches!(r, ProgressReport::Wake { point: 0, .. }))
            .count();
        assert!((1..=3).contains(&wakes));
    }

    #[test]
    fn spawned_task_joins_with_results() {
        let spec = PolarSpec::fixed_speed("bg", AnalysisMethod::Vlm1, 15.0, &[1.0, 3.0]);
        let handle = AnalysisTask::new(small_plate(), Polar::new(spec)).spawn().unwrap();
        let progress = handle.progress();
        let report = handle.join().unwrap();
        assert_eq!(report.state, TaskState::Finished { has_errors: false });
        assert_eq!(report.polar.results.len(), 2);
        assert!(report.polar.results[1].coefficients.cl > report.polar.results[0].coefficients.cl);
        assert!(progress.is_closed());
    }

    #[test]
    fn lifting_line_polar_reports_span_loading() {
        init_tracing();
        let spec = PolarSpec::fixed_speed("llt", AnalysisMethod::LiftingLine, 20.0, &[0.0, 2.0, 4.0])
            .with_viscous(crate::polar::ViscousParams::default());
        let profile: Arc<dyn ViscousCorrection> = Arc::new(|_cl: f64, _reynolds: f64| 0.008);
        let recorder = Arc::new(Recorder::default());
        let report = AnalysisTask::new(Arc::new(plate_store(1.0, 8.0, 2, 16)), Polar::new(spec))
            .with_viscous(profile)
            .with_listener(recorder.clone())
            .run();
        assert_eq!(report.state, TaskState::Finished { has_errors: false });
        assert_eq!(recorder.finished.load(Ordering::SeqCst), 3);
        let results = &report.polar.results;
        assert!(results[0].coefficients.cl.abs() < 1e-12);
        assert!(results[2].coefficients.cl > results[1].coefficients.cl);
        for snapshot in results {
            assert_eq!(snapshot.span.len(), 16);
            assert_eq!(snapshot.wake_strengths.len(), 16);
            assert!(snapshot.cp.is_empty());
            assert_relative_eq!(snapshot.coefficients.cd_viscous, 0.008, max_relative = 1e-9);
        }
    }

    #[test]
    fn lifting_line_fixed_lift_balances_weight() {
        let mass = 3.0;
        let mut spec = PolarSpec::fixed_speed("llt-t2", AnalysisMethod::LiftingLine, 10.0, &[3.0]);
        spec.polar_type = PolarType::FixedLift;
        let spec = spec.with_mass(mass, Point3::new(0.25, 0.0, 0.0));
        let report = AnalysisTask::new(Arc::new(plate_store(1.0, 8.0, 1, 16)), Polar::new(spec)).run();
        assert_eq!(report.state, TaskState::Finished { has_errors: false });
        let snapshot = &report.polar.results[0];
        let (_, _, lift_axis) = wind_axes(3.0_f64.to_radians(), 0.0);
        assert_relative_eq!(snapshot.force.dot(&lift_axis), mass * GRAVITY, max_relative = 1e-9);
    }

    #[test]
    fn lifting_line_stability_polar_is_rejected() {
        let sweep = Sweep::Controls {
            base: OperatingCondition::new(0.0, 10.0),
            values: vec![0.0],
        };
        let spec = PolarSpec::new("llt-t7", PolarType::Stability, AnalysisMethod::LiftingLine, sweep)
            .with_mass(1.0, Point3::origin());
        let report = AnalysisTask::new(small_plate(), Polar::new(spec)).run();
        assert_eq!(report.state, TaskState::Fatal);
        assert!(matches!(
            report.error,
            Some(PanelflowError::Analysis(AnalysisError::UnsupportedMethod { .. }))
        ));
    }
}
