use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::kernel::{
    body_potential_row, body_velocity_row, source_potential_row, source_velocity_row,
    wake_potential_row, wake_velocity_row, InfluenceStrategy,
};
use crate::math::DMatrix;
use crate::mesh::{PanelMesh, WakeMesh};
use crate::task::CancelToken;

/// Rows assembled per parallel work item.
const DEFAULT_BLOCK_ROWS: usize = 16;

/// Doublet and source influence blocks of the body panels on themselves.
///
/// Rows of thick panels hold potentials at the collocation point (Dirichlet
/// condition), rows of thin panels hold normal velocities (Neumann).
#[derive(Debug, Clone)]
pub struct BodySystem {
    pub doublets: DMatrix,
    pub sources: DMatrix,
}

/// Builds influence matrices in parallel blocks of rows.
///
/// Must run inside the task's thread pool; the pool is taken from the
/// calling context.
pub struct InfluenceMatrixBuilder<'a> {
    mesh: &'a PanelMesh,
    strategy: &'a dyn InfluenceStrategy,
    cancel: Option<&'a CancelToken>,
    block_rows: usize,
}

impl<'a> InfluenceMatrixBuilder<'a> {
    #[must_use]
    pub fn new(mesh: &'a PanelMesh, strategy: &'a dyn InfluenceStrategy) -> Self {
        Self {
            mesh,
            strategy,
            cancel: None,
            block_rows: DEFAULT_BLOCK_ROWS,
        }
    }

    /// Checks `token` before each block of rows.
    #[must_use]
    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn with_block_rows(mut self, rows: usize) -> Self {
        self.block_rows = rows.max(1);
        self
    }

    /// Assembles the body doublet and source blocks.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SolverError::Cancelled`] when cancelled.
    pub fn body_system(&self) -> Result<BodySystem> {
        let n = self.mesh.len();
        let params = self.strategy.params();
        let combined = self.assemble(2 * n, |i, row| {
            let panel = self.mesh.panel(i);
            let point = &panel.collocation;
            let (doublets, sources) = row.split_at_mut(n);
            if panel.is_thin() {
                let dv = body_velocity_row(self.strategy, self.mesh, point);
                let sv = source_velocity_row(self.mesh, params, point, Some(i));
                for (out, v) in doublets.iter_mut().zip(&dv) {
                    *out = v.dot(&panel.normal);
                }
                for (out, v) in sources.iter_mut().zip(&sv) {
                    *out = v.dot(&panel.normal);
                }
            } else {
                doublets.copy_from_slice(&body_potential_row(self.strategy, self.mesh, point, Some(i)));
                sources.copy_from_slice(&source_potential_row(self.mesh, params, point, Some(i)));
            }
        })?;
        debug!(panels = n, "assembled body influence blocks");
        Ok(BodySystem {
            doublets: combined.columns(0, n).into_owned(),
            sources: combined.columns(n, n).into_owned(),
        })
    }

    /// Influence of each wake column at unit strength on the body rows.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SolverError::Cancelled`] when cancelled.
    pub fn wake_coupling(&self, wake: &WakeMesh) -> Result<DMatrix> {
        let params = self.strategy.params();
        let columns = wake.columns().len();
        self.assemble(columns, |i, row| {
            let panel = self.mesh.panel(i);
            let point = &panel.collocation;
            if panel.is_thin() {
                let wv = wake_velocity_row(wake, params, point);
                for (out, v) in row.iter_mut().zip(&wv) {
                    *out = v.dot(&panel.normal);
                }
            } else {
                row.copy_from_slice(&wake_potential_row(wake, params, point));
            }
        })
    }

    fn assemble(&self, columns: usize, fill: impl Fn(usize, &mut [f64]) + Sync) -> Result<DMatrix> {
        let rows = self.mesh.len();
        if columns == 0 {
            return Ok(DMatrix::zeros(rows, 0));
        }
        let mut data = vec![0.0; rows * columns];
        let block = self.block_rows;
        data.par_chunks_mut(block * columns)
            .enumerate()
            .try_for_each(|(b, chunk)| -> Result<()> {
                if let Some(token) = self.cancel {
                    token.check()?;
                }
                for (k, row) in chunk.chunks_mut(columns).enumerate() {
                    fill(b * block + k, row);
                }
                Ok(())
            })?;
        Ok(DMatrix::from_row_slice(rows, columns, &data))
    }
}
