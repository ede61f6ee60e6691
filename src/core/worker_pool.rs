//! Bounded thread worker pool
//!
//! This module provides the `WorkerPool` struct, a fixed set of OS threads
//! fed through a bounded job channel and reporting through a result channel.
//!
//! # Architecture
//!
//! ```text
//! submit() ──► [job channel, capacity C] ──► worker 0..W ──► [result channel] ──► recv_result()
//!                                                 │
//!                                        processor(payload, &token)
//! ```
//!
//! Workers share nothing but the two channels. `submit` blocks while the job
//! channel is full (backpressure). `close` drops the pool's job sender; each
//! worker keeps taking jobs until the channel is both disconnected and
//! empty, then exits. Every submitted job therefore yields exactly one
//! result, whether it succeeded, failed or was cancelled.
//!
//! # Cancellation
//!
//! `recv_result_timeout` gives up waiting without touching the job a worker
//! has already claimed: that job keeps running. To stop it as well, call
//! `cancel`. The processing function receives the pool's
//! `CancellationToken` and is expected to check it; jobs still queued when
//! the token fires are reported as `JobCancelled` without being run.

use crate::types::{CoreError, Job, JobId, JobResult};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration shared by the thread and async worker pools
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of workers
    pub workers: usize,
    /// Capacity of the job queue
    pub queue_capacity: usize,
    /// Capacity of the result queue
    pub result_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            queue_capacity: 100,
            result_capacity: 100,
        }
    }
}

impl PoolConfig {
    /// Create a new PoolConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(workers: usize, queue_capacity: usize, result_capacity: usize) -> Self {
        let default = Self::default();

        Self {
            workers: non_zero_or_default("workers", workers, default.workers),
            queue_capacity: non_zero_or_default(
                "queue_capacity",
                queue_capacity,
                default.queue_capacity,
            ),
            result_capacity: non_zero_or_default(
                "result_capacity",
                result_capacity,
                default.result_capacity,
            ),
        }
    }
}

impl PoolConfig {
    /// Copy with every zero value replaced by its default
    ///
    /// The fields are public, so a config built as a struct literal may skip
    /// the fallback in [`PoolConfig::new`]. Both pools run their config
    /// through this before sizing channels or workers.
    pub fn sanitized(&self) -> Self {
        Self::new(self.workers, self.queue_capacity, self.result_capacity)
    }
}

fn non_zero_or_default(field: &str, value: usize, default: usize) -> usize {
    if value == 0 {
        tracing::warn!(field, default, "invalid pool setting 0, using default");
        default
    } else {
        value
    }
}

/// Fixed-size pool of worker threads
///
/// The pool must be consumed with [`WorkerPool::shutdown`] to wait for the
/// workers. Dropping it only closes the job queue; workers then stop as soon
/// as they fail to publish a result.
pub struct WorkerPool<P, O> {
    /// Producer side of the job queue, `None` once closed
    jobs: Mutex<Option<Sender<Job<P>>>>,

    /// Consumer side of the result queue
    results: Receiver<JobResult<O>>,

    /// Worker threads, drained by `shutdown`
    workers: Vec<JoinHandle<()>>,

    /// Cancellation shared with every worker
    cancel: CancellationToken,
}

impl<P, O> WorkerPool<P, O>
where
    P: Send + 'static,
    O: Send + 'static,
{
    /// Start a pool running `processor` on every submitted job
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count and queue capacities
    /// * `processor` - Called once per job with its payload and the pool's
    ///   cancellation token. `Err` and panics are captured into that job's
    ///   result and do not affect the worker or other jobs.
    pub fn new<F>(config: PoolConfig, processor: F) -> Self
    where
        F: Fn(P, &CancellationToken) -> Result<O, String> + Send + Sync + 'static,
    {
        let config = config.sanitized();
        let (job_tx, job_rx) = bounded(config.queue_capacity);
        let (result_tx, result_rx) = bounded(config.result_capacity);
        let processor = Arc::new(processor);
        let cancel = CancellationToken::new();

        let workers = (0..config.workers)
            .map(|worker_id| {
                let jobs = job_rx.clone();
                let results = result_tx.clone();
                let processor = Arc::clone(&processor);
                let cancel = cancel.clone();
                thread::spawn(move || run_worker(worker_id, jobs, results, processor, cancel))
            })
            .collect();

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Self {
            jobs: Mutex::new(Some(job_tx)),
            results: result_rx,
            workers,
            cancel,
        }
    }

    /// Enqueue a job, blocking while the job queue is full
    ///
    /// # Errors
    ///
    /// Returns `PoolClosed` if `close` or `shutdown` has already been called.
    pub fn submit(&self, job: Job<P>) -> Result<(), CoreError> {
        // Clone the sender out so a blocked send does not hold the lock.
        let sender = self.jobs.lock().clone().ok_or(CoreError::PoolClosed)?;
        sender.send(job).map_err(|_| CoreError::PoolClosed)
    }

    /// Stop accepting jobs
    ///
    /// Jobs already queued are still processed.
    pub fn close(&self) {
        if self.jobs.lock().take().is_some() {
            tracing::debug!("worker pool closed for submissions");
        }
    }

    /// Whether the pool has stopped accepting jobs
    pub fn is_closed(&self) -> bool {
        self.jobs.lock().is_none()
    }

    /// Signal workers to stop
    ///
    /// Queued jobs are reported as cancelled without running; running jobs
    /// see the token fire.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token handed to the processing function
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Block until the next result is available
    ///
    /// # Errors
    ///
    /// Returns `ResultsExhausted` once every worker has exited and every
    /// result has been received.
    pub fn recv_result(&self) -> Result<JobResult<O>, CoreError> {
        self.results.recv().map_err(|_| CoreError::ResultsExhausted)
    }

    /// Wait up to `timeout` for the next result
    ///
    /// # Errors
    ///
    /// - `Timeout` if nothing arrived in time; the job being waited for keeps running
    /// - `ResultsExhausted` if no result can arrive anymore
    pub fn recv_result_timeout(&self, timeout: Duration) -> Result<JobResult<O>, CoreError> {
        self.results.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => CoreError::timeout(timeout),
            RecvTimeoutError::Disconnected => CoreError::ResultsExhausted,
        })
    }

    /// Close the pool, drain the remaining results and wait for every worker
    ///
    /// Results are collected while the workers finish, so a full result
    /// queue never stalls shutdown. Returns the results not yet received
    /// through `recv_result`.
    pub fn shutdown(mut self) -> Vec<JobResult<O>> {
        self.close();

        let results: Vec<JobResult<O>> = self.results.iter().collect();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked outside job processing");
            }
        }

        tracing::info!(results = results.len(), "worker pool shut down");
        results
    }
}

impl<P, O> Drop for WorkerPool<P, O> {
    fn drop(&mut self) {
        self.jobs.get_mut().take();
    }
}

fn run_worker<P, O, F>(
    worker_id: usize,
    jobs: Receiver<Job<P>>,
    results: Sender<JobResult<O>>,
    processor: Arc<F>,
    cancel: CancellationToken,
) where
    F: Fn(P, &CancellationToken) -> Result<O, String>,
{
    tracing::debug!(worker_id, "worker started");

    // Ends once the job queue is disconnected and empty.
    for job in jobs.iter() {
        let result = if cancel.is_cancelled() {
            JobResult::failure(job.id, CoreError::job_cancelled(job.id))
        } else {
            execute(processor.as_ref(), job, &cancel)
        };

        if results.send(result).is_err() {
            tracing::debug!(worker_id, "result queue dropped, worker stopping early");
            break;
        }
    }

    tracing::debug!(worker_id, "worker stopped");
}

fn execute<P, O, F>(processor: &F, job: Job<P>, cancel: &CancellationToken) -> JobResult<O>
where
    F: Fn(P, &CancellationToken) -> Result<O, String>,
{
    let Job { id, payload } = job;

    match panic::catch_unwind(AssertUnwindSafe(|| processor(payload, cancel))) {
        Ok(Ok(output)) => JobResult::success(id, output),
        Ok(Err(message)) => job_error(id, message, cancel),
        Err(panic) => job_error(id, panic_message(panic.as_ref()), cancel),
    }
}

/// Map a processing failure to the job's error
///
/// A failure after the token fired is reported as a cancellation.
pub(crate) fn job_error<O>(id: JobId, message: String, cancel: &CancellationToken) -> JobResult<O> {
    if cancel.is_cancelled() {
        return JobResult::failure(id, CoreError::job_cancelled(id));
    }
    tracing::debug!(job = id, %message, "job failed");
    JobResult::failure(id, CoreError::job_failed(id, message))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
