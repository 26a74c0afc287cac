//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Sink for progress updates from long-running work.
///
/// Cancellation is cooperative: workers poll [`ProgressMonitor::is_canceled`]
/// between units of work.
pub trait ProgressMonitor: Send + Sync {
    fn begin_task(&self, _name: &str, _total_work: u64) {}

    fn sub_task(&self, _name: &str) {}

    fn worked(&self, _work: u64) {}

    fn done(&self) {}

    fn is_canceled(&self) -> bool;

    fn set_canceled(&self, canceled: bool);
}

/// Shared cancellation signal that can be handed to other threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Monitor that only tracks cancellation.
#[derive(Debug, Clone, Default)]
pub struct NullProgressMonitor {
    canceled: CancellationFlag,
}

impl NullProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressMonitor for NullProgressMonitor {
    fn is_canceled(&self) -> bool {
        self.canceled.is_cancelled()
    }

    fn set_canceled(&self, canceled: bool) {
        if canceled {
            self.canceled.cancel();
        } else {
            self.canceled.reset();
        }
    }
}

/// Monitor that records work and logs task transitions through `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressMonitor {
    canceled: CancellationFlag,
    task: Mutex<Option<String>>,
    total: AtomicU64,
    worked: AtomicU64,
}

impl TracingProgressMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monitor that observes an externally owned cancellation flag.
    pub fn with_cancellation(flag: CancellationFlag) -> Self {
        Self {
            canceled: flag,
            ..Self::default()
        }
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.canceled.clone()
    }

    pub fn work_done(&self) -> u64 {
        self.worked.load(Ordering::SeqCst)
    }

    pub fn total_work(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}

impl ProgressMonitor for TracingProgressMonitor {
    fn begin_task(&self, name: &str, total_work: u64) {
        self.total.store(total_work, Ordering::SeqCst);
        self.worked.store(0, Ordering::SeqCst);
        if let Ok(mut task) = self.task.lock() {
            *task = Some(name.to_string());
        }
        tracing::debug!(task = name, total_work, "task started");
    }

    fn sub_task(&self, name: &str) {
        tracing::trace!(sub_task = name, "progress");
    }

    fn worked(&self, work: u64) {
        let done = self.worked.fetch_add(work, Ordering::SeqCst) + work;
        tracing::trace!(done, total = self.total.load(Ordering::SeqCst), "progress");
    }

    fn done(&self) {
        let task = self.task.lock().ok().and_then(|mut t| t.take());
        tracing::debug!(task = task.as_deref().unwrap_or(""), "task finished");
    }

    fn is_canceled(&self) -> bool {
        self.canceled.is_cancelled()
    }

    fn set_canceled(&self, canceled: bool) {
        if canceled {
            self.canceled.cancel();
        } else {
            self.canceled.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let monitor = TracingProgressMonitor::with_cancellation(flag.clone());
        assert!(!monitor.is_canceled());
        flag.cancel();
        assert!(monitor.is_canceled());
        monitor.set_canceled(false);
        assert!(!flag.is_cancelled());
    }

    #[test]
    fn records_work() {
        let monitor = TracingProgressMonitor::new();
        monitor.begin_task("download", 3);
        monitor.worked(1);
        monitor.worked(2);
        monitor.done();
        assert_eq!(monitor.work_done(), 3);
        assert_eq!(monitor.total_work(), 3);
    }
}
