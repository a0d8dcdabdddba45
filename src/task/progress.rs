//! Bounded progress queue between the analysis worker and its consumer.
//!
//! The worker never waits on the consumer: once the queue is full the oldest
//! report is dropped and counted.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

use crate::math::Point3;

/// A message from the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressReport {
    Log(String),
    /// Wake node positions during free-wake relaxation.
    Wake {
        point: usize,
        iteration: usize,
        nodes: Vec<Point3>,
    },
    PointFinished {
        point: usize,
        converged: bool,
    },
}

struct Inner {
    reports: VecDeque<ProgressReport>,
    capacity: usize,
    dropped: u64,
    closed: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    ready: Condvar,
}

/// Producer side of the progress queue.
#[derive(Clone)]
pub struct ProgressQueue {
    shared: Arc<Shared>,
}

/// Consumer side of the progress queue. Clones share the same reports.
#[derive(Clone)]
pub struct ProgressReceiver {
    shared: Arc<Shared>,
}

impl ProgressQueue {
    /// Creates a queue holding at most `capacity` reports (at least one).
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, ProgressReceiver) {
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                reports: VecDeque::with_capacity(capacity.max(1)),
                capacity: capacity.max(1),
                dropped: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ProgressReceiver { shared },
        )
    }

    /// Enqueues a report, dropping the oldest one when full.
    pub fn push(&self, report: ProgressReport) {
        let mut inner = self.shared.inner.lock();
        if inner.reports.len() >= inner.capacity {
            inner.reports.pop_front();
            inner.dropped += 1;
            if inner.dropped == 1 {
                warn!(capacity = inner.capacity, "progress queue full, dropping oldest reports");
            }
        }
        inner.reports.push_back(report);
        drop(inner);
        self.shared.ready.notify_one();
    }

    pub fn log(&self, message: impl Into<String>) {
        self.push(ProgressReport::Log(message.into()));
    }

    /// Marks the end of the stream; blocked receivers return once drained.
    pub fn close(&self) {
        self.shared.inner.lock().closed = true;
        self.shared.ready.notify_all();
    }

    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.inner.lock().dropped
    }
}

impl ProgressReceiver {
    #[must_use]
    pub fn try_recv(&self) -> Option<ProgressReport> {
        self.shared.inner.lock().reports.pop_front()
    }

    /// Blocks until a report arrives. Returns `None` once the queue is closed
    /// and empty.
    #[must_use]
    pub fn recv(&self) -> Option<ProgressReport> {
        let mut inner = self.shared.inner.lock();
        loop {
            if let Some(report) = inner.reports.pop_front() {
                return Some(report);
            }
            if inner.closed {
                return None;
            }
            self.shared.ready.wait(&mut inner);
        }
    }

    /// Like [`Self::recv`], giving up after `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressReport> {
        let mut inner = self.shared.inner.lock();
        loop {
            if let Some(report) = inner.reports.pop_front() {
                return Some(report);
            }
            if inner.closed || self.shared.ready.wait_for(&mut inner, timeout).timed_out() {
                return inner.reports.pop_front();
            }
        }
    }

    /// Takes every queued report.
    #[must_use]
    pub fn drain(&self) -> Vec<ProgressReport> {
        self.shared.inner.lock().reports.drain(..).collect()
    }

    /// Reports discarded because the consumer fell behind.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.inner.lock().dropped
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.inner.lock().closed
    }
}
