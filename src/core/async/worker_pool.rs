//! Bounded async worker pool on tokio tasks
//!
//! `AsyncWorkerPool` keeps the contract of the thread [`WorkerPool`]: W
//! workers, a bounded job queue with backpressure on `submit`, exactly one
//! result per submitted job, and a shutdown that drains the queue before the
//! workers exit.
//!
//! # Design
//!
//! Workers are tokio tasks sharing the job receiver behind a
//! `tokio::sync::Mutex`; whichever worker holds it takes the next job. Each
//! job runs inside a `tokio::select!` against the pool's cancellation token,
//! so `cancel` stops in-flight jobs at their next await point instead of
//! leaving them to run unattended after a caller timed out. Panics inside
//! the job future are caught with `catch_unwind` and become `JobFailed`.
//!
//! [`WorkerPool`]: crate::core::WorkerPool

use crate::core::worker_pool::{job_error, panic_message, PoolConfig};
use crate::types::{CoreError, Job, JobResult};
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type SharedJobs<P> = Arc<tokio::sync::Mutex<mpsc::Receiver<Job<P>>>>;

/// Fixed-size pool of tokio worker tasks
///
/// Consume it with [`AsyncWorkerPool::shutdown`] to wait for the workers.
pub struct AsyncWorkerPool<P, O> {
    /// Producer side of the job queue, `None` once closed
    jobs: Mutex<Option<mpsc::Sender<Job<P>>>>,

    /// Consumer side of the result queue
    results: tokio::sync::Mutex<mpsc::Receiver<JobResult<O>>>,

    /// Worker tasks, drained by `shutdown`
    workers: Vec<JoinHandle<()>>,

    /// Cancellation shared with every worker
    cancel: CancellationToken,
}

impl<P, O> AsyncWorkerPool<P, O>
where
    P: Send + 'static,
    O: Send + 'static,
{
    /// Start a pool running `processor` on every submitted job
    ///
    /// `processor` receives the payload and a child of the pool's
    /// cancellation token. Must be called from within a tokio runtime.
    pub fn new<F, Fut>(config: PoolConfig, processor: F) -> Self
    where
        F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, String>> + Send + 'static,
    {
        let config = config.sanitized();
        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(config.result_capacity);
        let jobs: SharedJobs<P> = Arc::new(tokio::sync::Mutex::new(job_rx));
        let processor = Arc::new(processor);
        let cancel = CancellationToken::new();

        let workers = (0..config.workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&jobs),
                    result_tx.clone(),
                    Arc::clone(&processor),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "async worker pool started"
        );

        Self {
            jobs: Mutex::new(Some(job_tx)),
            results: tokio::sync::Mutex::new(result_rx),
            workers,
            cancel,
        }
    }

    /// Enqueue a job, waiting while the job queue is full
    ///
    /// # Errors
    ///
    /// Returns `PoolClosed` if `close` or `shutdown` has already been called.
    pub async fn submit(&self, job: Job<P>) -> Result<(), CoreError> {
        let sender = self.jobs.lock().clone().ok_or(CoreError::PoolClosed)?;
        sender.send(job).await.map_err(|_| CoreError::PoolClosed)
    }

    /// Stop accepting jobs; queued jobs are still processed
    pub fn close(&self) {
        if self.jobs.lock().take().is_some() {
            tracing::debug!("async worker pool closed for submissions");
        }
    }

    /// Whether the pool has stopped accepting jobs
    pub fn is_closed(&self) -> bool {
        self.jobs.lock().is_none()
    }

    /// Cancel queued and in-flight jobs
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The pool's cancellation token
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the next result
    ///
    /// # Errors
    ///
    /// Returns `ResultsExhausted` once every worker has exited and every
    /// result has been received.
    pub async fn recv_result(&self) -> Result<JobResult<O>, CoreError> {
        self.results
            .lock()
            .await
            .recv()
            .await
            .ok_or(CoreError::ResultsExhausted)
    }

    /// Wait up to `timeout` for the next result
    ///
    /// A timeout does not stop the job that was being waited for; follow it
    /// with [`AsyncWorkerPool::cancel`] to do that.
    ///
    /// # Errors
    ///
    /// - `Timeout` if nothing arrived in time
    /// - `ResultsExhausted` if no result can arrive anymore
    pub async fn recv_result_timeout(&self, timeout: Duration) -> Result<JobResult<O>, CoreError> {
        tokio::time::timeout(timeout, self.recv_result())
            .await
            .map_err(|_| CoreError::timeout(timeout))?
    }

    /// Close the pool, drain the remaining results and wait for every worker
    pub async fn shutdown(mut self) -> Vec<JobResult<O>> {
        self.close();

        let mut results = Vec::new();
        {
            let mut receiver = self.results.lock().await;
            while let Some(result) = receiver.recv().await {
                results.push(result);
            }
        }

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("worker task failed: {}", e);
            }
        }

        tracing::info!(results = results.len(), "async worker pool shut down");
        results
    }
}

impl<P, O> Drop for AsyncWorkerPool<P, O> {
    fn drop(&mut self) {
        self.jobs.get_mut().take();
    }
}

async fn run_worker<P, O, F, Fut>(
    worker_id: usize,
    jobs: SharedJobs<P>,
    results: mpsc::Sender<JobResult<O>>,
    processor: Arc<F>,
    cancel: CancellationToken,
) where
    P: Send + 'static,
    O: Send + 'static,
    F: Fn(P, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, String>> + Send + 'static,
{
    tracing::debug!(worker_id, "async worker started");

    loop {
        let next = jobs.lock().await.recv().await;
        let Some(Job { id, payload }) = next else {
            break;
        };

        let result = if cancel.is_cancelled() {
            JobResult::failure(id, CoreError::job_cancelled(id))
        } else {
            let processor = Arc::clone(&processor);
            let token = cancel.child_token();
            let work = AssertUnwindSafe(async move { processor(payload, token).await }).catch_unwind();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => JobResult::failure(id, CoreError::job_cancelled(id)),
                outcome = work => match outcome {
                    Ok(Ok(output)) => JobResult::success(id, output),
                    Ok(Err(message)) => job_error(id, message, &cancel),
                    Err(panic) => job_error(id, panic_message(panic.as_ref()), &cancel),
                },
            }
        };

        if results.send(result).await.is_err() {
            tracing::debug!(worker_id, "result queue dropped, async worker stopping early");
            break;
        }
    }

    tracing::debug!(worker_id, "async worker stopped");
}
