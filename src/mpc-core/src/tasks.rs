//! Bounded worker pool for fire-and-forget parallel work.
//!
//! Tasks are gathered and reported, never dropped: every failure is kept
//! until all submitted tasks have been drained, then reported as a single
//! status (one failure) or an aggregate (several).

use crate::progress::ProgressMonitor;
use crate::status::Status;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Upper bound on worker threads regardless of the requested size.
pub const MAX_THREADS: usize = 10;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_MAX_RETRIES: u32 = 15;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task manager has been shut down")]
    ShutDown,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::io::Error),
    #[error("{0}")]
    Failed(Status),
    #[error("{0}")]
    Cancelled(Status),
}

impl TaskError {
    /// The status describing this error, when there is one.
    pub fn status(&self) -> Option<&Status> {
        match self {
            TaskError::Failed(status) | TaskError::Cancelled(status) => Some(status),
            _ => None,
        }
    }
}

/// Polling behaviour of [`ConcurrentTaskManager::wait_until_finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskManagerConfig {
    /// How long to block on a single task before re-checking cancellation.
    pub poll_interval: Duration,
    /// Polls per task before it is given up on.
    pub max_retries: u32,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

enum TaskOutcome {
    Completed,
    Failed(Status),
    Skipped,
}

struct PendingTask {
    label: String,
    result: Receiver<TaskOutcome>,
    cancelled: Arc<AtomicBool>,
}

impl PendingTask {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Runs independent tasks on a fixed-size pool and blocks until they are
/// all done.
pub struct ConcurrentTaskManager {
    name: String,
    config: TaskManagerConfig,
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pending: Vec<PendingTask>,
    abandoned: bool,
}

impl std::fmt::Debug for ConcurrentTaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentTaskManager")
            .field("name", &self.name)
            .field("workers", &self.workers.len())
            .field("pending", &self.pending.len())
            .field("shut_down", &self.is_shutdown())
            .finish()
    }
}

/// Effective pool size for a requested number of workers.
pub fn pool_size(requested: usize) -> usize {
    requested.clamp(1, MAX_THREADS)
}

impl ConcurrentTaskManager {
    pub fn new(requested: usize, name: impl Into<String>) -> Result<Self, TaskError> {
        Self::with_config(requested, name, TaskManagerConfig::default())
    }

    pub fn with_config(
        requested: usize,
        name: impl Into<String>,
        config: TaskManagerConfig,
    ) -> Result<Self, TaskError> {
        let name = name.into();
        let size = pool_size(requested);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = Arc::clone(&receiver);
            let worker = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || worker_loop(receiver))
                .map_err(TaskError::Spawn)?;
            workers.push(worker);
        }
        tracing::debug!(pool = %name, size, "task pool started");

        Ok(Self {
            name,
            config,
            sender: Some(sender),
            workers,
            pending: Vec::new(),
            abandoned: false,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.is_none()
    }

    /// Enqueues a task. Tasks start in submission order as workers free up.
    pub fn submit<F, E>(&mut self, label: impl Into<String>, task: F) -> Result<(), TaskError>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        let sender = self.sender.as_ref().ok_or(TaskError::ShutDown)?;
        let label = label.into();
        let (result_tx, result_rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let job_label = label.clone();
        let job_cancelled = Arc::clone(&cancelled);
        let job: Job = Box::new(move || {
            if job_cancelled.load(Ordering::SeqCst) {
                let _ = result_tx.send(TaskOutcome::Skipped);
                return;
            }
            let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(error)) => {
                    let error: BoxError = error.into();
                    tracing::debug!(task = %job_label, error = %error, "task failed");
                    let status = Status::error(error.to_string()).with_source(Arc::from(error));
                    TaskOutcome::Failed(status)
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(task = %job_label, "task panicked: {message}");
                    TaskOutcome::Failed(Status::error(format!("{job_label} panicked: {message}")))
                }
            };
            let _ = result_tx.send(outcome);
        });

        sender.send(job).map_err(|_| TaskError::ShutDown)?;
        self.pending.push(PendingTask {
            label,
            result: result_rx,
            cancelled,
        });
        Ok(())
    }

    /// Blocks until every submitted task has finished, failed, or been
    /// abandoned because `monitor` was cancelled. The pool is shut down on
    /// every exit path.
    pub fn wait_until_finished(&mut self, monitor: &dyn ProgressMonitor) -> Result<(), TaskError> {
        let pending = std::mem::take(&mut self.pending);
        monitor.begin_task(&self.name, pending.len() as u64);

        let mut failures = Vec::new();
        let mut cancelled = false;

        for (index, task) in pending.iter().enumerate() {
            monitor.sub_task(&task.label);
            let mut retries = 0;
            loop {
                match task.result.recv_timeout(self.config.poll_interval) {
                    Ok(TaskOutcome::Completed) | Ok(TaskOutcome::Skipped) => break,
                    Ok(TaskOutcome::Failed(status)) => {
                        failures.push(status);
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        failures.push(Status::error(format!(
                            "{} ended without reporting a result",
                            task.label
                        )));
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if monitor.is_canceled() {
                            cancelled = true;
                            break;
                        }
                        retries += 1;
                        if retries >= self.config.max_retries {
                            tracing::warn!(
                                pool = %self.name,
                                task = %task.label,
                                retries,
                                "giving up on task"
                            );
                            task.cancel();
                            self.abandoned = true;
                            failures.push(Status::error(format!(
                                "{} did not finish in time",
                                task.label
                            )));
                            break;
                        }
                    }
                }
            }

            if cancelled {
                // the timed-out task and everything after it are left behind
                for rest in &pending[index..] {
                    rest.cancel();
                }
                self.abandoned = true;
                break;
            }
            monitor.worked(1);
        }

        self.shutdown();
        monitor.done();

        if cancelled {
            tracing::info!(pool = %self.name, "tasks cancelled");
            let status = Status::multi("operation cancelled", failures).into_cancel();
            return Err(TaskError::Cancelled(status));
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(TaskError::Failed(failures.remove(0))),
            count => {
                tracing::debug!(pool = %self.name, count, "multiple tasks failed");
                Err(TaskError::Failed(Status::multi(
                    format!("{count} tasks failed"),
                    failures,
                )))
            }
        }
    }

    /// Stops accepting work. Workers exit once the queue drains; they are
    /// joined unless a task was abandoned mid-flight.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for task in &self.pending {
            task.cancel();
        }
        let workers = std::mem::take(&mut self.workers);
        if self.abandoned {
            tracing::debug!(pool = %self.name, "detaching workers with abandoned tasks");
            return;
        }
        for worker in workers {
            let _ = worker.join();
        }
        tracing::debug!(pool = %self.name, "task pool shut down");
    }
}

impl Drop for ConcurrentTaskManager {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            self.abandoned = true;
        }
        self.shutdown();
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = match receiver.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => break,
        };
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
