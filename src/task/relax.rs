//! Free-wake relaxation: wake node chains are re-traced along the local
//! velocity until their shape settles.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::kernel::InducedField;
use crate::math::{Point3, TOLERANCE};
use crate::polar::{OperatingCondition, PointStatus, RelaxationParams};
use crate::solver::{dof_weights, relative_wind};

use super::{CancelToken, ProgressQueue, ProgressReport, SolverSession, StateCell, TaskState};

/// Where relaxation reports go.
pub(crate) struct RelaxationMonitor<'a> {
    pub point: usize,
    pub state: &'a StateCell,
    pub cancel: &'a CancelToken,
    /// Set when wake snapshots should be published.
    pub progress: Option<&'a ProgressQueue>,
}

/// Relaxes the session's wake for `condition`. Each iteration re-traces
/// every node chain from its trailing-edge node, keeping the step lengths,
/// blends the result with the current wake and re-solves.
///
/// # Errors
///
/// Returns [`crate::error::SolverError::Cancelled`] when cancelled between
/// iterations, [`AnalysisError::RelaxationDiverged`] if node positions
/// become non-finite, and any error of the session rebuild.
pub(crate) fn relax_wake(
    session: &mut SolverSession,
    condition: &OperatingCondition,
    params: &RelaxationParams,
    chord: f64,
    monitor: &RelaxationMonitor<'_>,
) -> Result<PointStatus> {
    let freestream = condition.freestream();
    let rates = condition.rates();
    let weights = dof_weights(&freestream, &rates);
    let threshold = params.tolerance * chord;

    for iteration in 1..=params.max_iterations {
        monitor.cancel.check()?;
        monitor.state.set(TaskState::WakeRelaxation {
            point: monitor.point,
            iteration,
        });

        let (nodes, displacement) = {
            let strengths = session.units().combine(&weights);
            let wake_strengths = session.kutta().column_strengths(strengths.doublets.as_slice());
            let field = InducedField::new(
                session.strategy(),
                session.mesh(),
                session.wake(),
                strengths.doublets.as_slice(),
                strengths.sources.as_slice(),
                &wake_strengths,
            );
            let reference = *session.reference();
            let wake = session.wake();
            let old = wake.nodes();
            let chains: Vec<(&[usize], &[f64])> = wake.chains().collect();
            let traced: Vec<Vec<(usize, Point3)>> = chains
                .par_iter()
                .map(|&(chain, steps)| {
                    let mut out = Vec::with_capacity(chain.len());
                    let mut previous = old[chain[0]];
                    out.push((chain[0], previous));
                    for (k, step) in steps.iter().enumerate() {
                        let at = old[chain[k]];
                        let velocity = relative_wind(&freestream, &rates, &at, &reference) + field.velocity(&at);
                        let direction = velocity
                            .try_normalize(TOLERANCE)
                            .unwrap_or_else(|| freestream.normalize());
                        let next = previous + direction * *step;
                        let blended = old[chain[k + 1]] + (next - old[chain[k + 1]]) * params.factor;
                        out.push((chain[k + 1], blended));
                        previous = blended;
                    }
                    out
                })
                .collect();
            let mut nodes = old.to_vec();
            let mut displacement: f64 = 0.0;
            for (index, position) in traced.into_iter().flatten() {
                displacement = displacement.max((position - old[index]).norm());
                nodes[index] = position;
            }
            (nodes, displacement)
        };

        if !displacement.is_finite() {
            return Err(AnalysisError::RelaxationDiverged { iterations: iteration }.into());
        }
        let mut wake = session.wake().clone();
        wake.set_nodes(nodes)?;
        if let Some(queue) = monitor.progress {
            queue.push(ProgressReport::Wake {
                point: monitor.point,
                iteration,
                nodes: wake.nodes().to_vec(),
            });
        }
        session.rebuild_wake(wake, Some(monitor.cancel))?;
        debug!(point = monitor.point, iteration, displacement, "wake relaxation step");

        if displacement < threshold {
            info!(point = monitor.point, iterations = iteration, "wake relaxation converged");
            return Ok(PointStatus::Converged);
        }
    }
    Ok(PointStatus::NotConverged)
}
