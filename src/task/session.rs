use tracing::debug;

use crate::error::Result;
use crate::forces::ForceMomentEngine;
use crate::kernel::{make_strategy, DensityKind, InfluenceStrategy, KernelParams, NodeAverage};
use crate::math::Point3;
use crate::mesh::{PanelMesh, WakeMesh};
use crate::solver::{
    BodySystem, FactorizedSystem, InfluenceMatrixBuilder, KuttaMap, UnitInducedVelocities,
    UnitSolutionSuperposer, UnitSolutions,
};

use super::CancelToken;

/// Factorized system and unit solutions of one mesh variant.
///
/// Built once per set of control deflections and reused for every
/// operating point that shares them.
pub struct SolverSession {
    mesh: PanelMesh,
    wake: WakeMesh,
    initial_wake: WakeMesh,
    kutta: KuttaMap,
    strategy: Box<dyn InfluenceStrategy>,
    average: Option<NodeAverage>,
    body: BodySystem,
    system: FactorizedSystem,
    units: UnitSolutions,
    induced: UnitInducedVelocities,
    reference: Point3,
}

impl SolverSession {
    /// Assembles, factorizes and solves the unit problems. `reference` is
    /// the rotation and moment reference point.
    ///
    /// Parallel steps run on the calling thread's rayon pool.
    ///
    /// # Errors
    ///
    /// Returns kernel errors for invalid parameters or a linear density on
    /// quads, [`crate::error::SolverError`] for a singular system or
    /// cancellation.
    pub fn build(
        mesh: PanelMesh,
        wake: WakeMesh,
        density: DensityKind,
        params: KernelParams,
        reference: Point3,
        cancel: Option<&CancelToken>,
    ) -> Result<Self> {
        let strategy = make_strategy(density, &mesh, params)?;
        let average = match density {
            DensityKind::Linear => Some(NodeAverage::new(&mesh)?),
            DensityKind::Uniform => None,
        };
        let kutta = KuttaMap::new(&wake);
        let mut builder = InfluenceMatrixBuilder::new(&mesh, strategy.as_ref());
        if let Some(token) = cancel {
            builder = builder.with_cancel(token);
        }
        let body = builder.body_system()?;
        let coupling = builder.wake_coupling(&wake)?;
        let system = FactorizedSystem::new(kutta.fold(&body.doublets, &coupling)?)?;
        let units = UnitSolutionSuperposer::new(&mesh, &system, &body.sources, reference).solve()?;
        let induced = UnitInducedVelocities::compute(strategy.as_ref(), &mesh, &wake, &kutta, &units, cancel)?;
        debug!(panels = mesh.len(), columns = kutta.len(), "solver session ready");
        Ok(Self {
            mesh,
            initial_wake: wake.clone(),
            wake,
            kutta,
            strategy,
            average,
            body,
            system,
            units,
            induced,
            reference,
        })
    }

    /// Replaces the wake geometry and re-solves. The body blocks are reused;
    /// only the wake coupling is reassembled.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::WakeColumn`] if the column count
    /// changes, and solver errors as [`Self::build`].
    pub fn rebuild_wake(&mut self, wake: WakeMesh, cancel: Option<&CancelToken>) -> Result<()> {
        wake.check_columns(self.wake_panels_per_column())?;
        let kutta = KuttaMap::new(&wake);
        let mut builder = InfluenceMatrixBuilder::new(&self.mesh, self.strategy.as_ref());
        if let Some(token) = cancel {
            builder = builder.with_cancel(token);
        }
        let coupling = builder.wake_coupling(&wake)?;
        let system = FactorizedSystem::new(kutta.fold(&self.body.doublets, &coupling)?)?;
        let units = UnitSolutionSuperposer::new(&self.mesh, &system, &self.body.sources, self.reference).solve()?;
        let induced =
            UnitInducedVelocities::compute(self.strategy.as_ref(), &self.mesh, &wake, &kutta, &units, cancel)?;
        self.wake = wake;
        self.kutta = kutta;
        self.system = system;
        self.units = units;
        self.induced = induced;
        Ok(())
    }

    /// Restores the wake the session was built with, if it was moved.
    ///
    /// # Errors
    ///
    /// As [`Self::rebuild_wake`].
    pub fn reset_wake(&mut self, cancel: Option<&CancelToken>) -> Result<()> {
        if self.wake.nodes() == self.initial_wake.nodes() {
            return Ok(());
        }
        self.rebuild_wake(self.initial_wake.clone(), cancel)
    }

    fn wake_panels_per_column(&self) -> usize {
        self.wake.columns().first().map_or(0, |c| c.panels.len())
    }

    #[must_use]
    pub fn mesh(&self) -> &PanelMesh {
        &self.mesh
    }

    #[must_use]
    pub fn wake(&self) -> &WakeMesh {
        &self.wake
    }

    #[must_use]
    pub fn kutta(&self) -> &KuttaMap {
        &self.kutta
    }

    #[must_use]
    pub fn strategy(&self) -> &dyn InfluenceStrategy {
        self.strategy.as_ref()
    }

    #[must_use]
    pub fn system(&self) -> &FactorizedSystem {
        &self.system
    }

    #[must_use]
    pub fn units(&self) -> &UnitSolutions {
        &self.units
    }

    #[must_use]
    pub fn reference(&self) -> &Point3 {
        &self.reference
    }

    /// Force engine over this session's solution, referenced to the mesh's
    /// own dimensions and the session's reference point.
    #[must_use]
    pub fn engine(&self) -> ForceMomentEngine<'_> {
        let engine = ForceMomentEngine::new(&self.mesh, &self.wake, &self.kutta, &self.units, &self.induced)
            .with_reference(self.mesh.reference_dims().unwrap_or_default(), self.reference)
            .with_core_radius(self.strategy.params().core_radius);
        match &self.average {
            Some(average) => engine.with_node_average(average),
            None => engine,
        }
    }
}
