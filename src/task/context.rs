use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SolverError};

/// Shared cooperative cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Work stops at the next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// # Errors
    ///
    /// Returns [`SolverError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SolverError::Cancelled.into())
        } else {
            Ok(())
        }
    }
}

/// Run-time settings of an analysis task.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub cancel: CancelToken,
    /// Worker threads for matrix assembly; `0` lets the pool decide.
    pub max_threads: usize,
    /// Publish wake geometry while relaxing.
    pub live_update: bool,
    /// Capacity of the progress queue before the oldest reports are dropped.
    pub queue_capacity: usize,
}

impl Default for TaskContext {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            max_threads: 0,
            live_update: false,
            queue_capacity: 256,
        }
    }
}

impl TaskContext {
    #[must_use]
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = threads;
        self
    }

    #[must_use]
    pub fn with_live_update(mut self, live: bool) -> Self {
        self.live_update = live;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Builds the worker pool for this task.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::ThreadPool`] if the pool cannot be created.
    pub fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_threads)
            .thread_name(|i| format!("panelflow-{i}"))
            .build()
            .map_err(|e| SolverError::ThreadPool(e.to_string()).into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn builds_bounded_pool() {
        let pool = TaskContext::default().with_max_threads(2).thread_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
