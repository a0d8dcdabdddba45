use std::sync::Arc;

use parking_lot::RwLock;

/// Lifecycle of an analysis task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    /// Relaxing the free wake of operating point `point`.
    WakeRelaxation { point: usize, iteration: usize },
    /// All points attempted; `has_errors` if any point failed or did not
    /// converge.
    Finished { has_errors: bool },
    Cancelled,
    Fatal,
}

impl TaskState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Cancelled | Self::Fatal)
    }

    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::WakeRelaxation { .. })
    }
}

/// Task state shared between the worker and its handle.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<RwLock<TaskState>>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(RwLock::new(TaskState::Idle)))
    }

    pub(crate) fn get(&self) -> TaskState {
        *self.0.read()
    }

    pub(crate) fn set(&self, state: TaskState) {
        *self.0.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TaskState::Finished { has_errors: true }.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
        assert!(!TaskState::WakeRelaxation { point: 0, iteration: 2 }.is_terminal());
        assert!(TaskState::WakeRelaxation { point: 0, iteration: 2 }.is_running());
        let cell = StateCell::new();
        let shared = cell.clone();
        shared.set(TaskState::Running);
        assert_eq!(cell.get(), TaskState::Running);
    }
}
