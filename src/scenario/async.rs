//! Asynchronous worker pool scenario
//!
//! Runs the doubling workload of [`ThreadPoolScenario`] on
//! [`AsyncWorkerPool`] inside a dedicated tokio multi-threaded runtime.
//!
//! # Architecture
//!
//! ```text
//! AsyncPoolScenario
//!     ├── PoolConfig (workers, queue_capacity, result_capacity)
//!     ├── tokio runtime (one worker thread per pool worker)
//!     └── AsyncWorkerPool
//!         ├── submitter future ──► job queue
//!         └── receiver future  ◄── result queue
//! ```
//!
//! Submission and result collection run concurrently so the bounded result
//! queue never stalls the submitter.
//!
//! [`ThreadPoolScenario`]: crate::scenario::ThreadPoolScenario

use crate::core::{AsyncWorkerPool, PoolConfig};
use crate::io::csv_format::write_job_results_csv;
use crate::scenario::sync::double;
use crate::scenario::Scenario;
use crate::types::Job;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Jobs `1..=jobs` doubling their payload on tokio tasks
#[derive(Debug, Clone)]
pub struct AsyncPoolScenario {
    config: PoolConfig,
    jobs: u64,
}

impl AsyncPoolScenario {
    /// Create a new AsyncPoolScenario
    ///
    /// # Arguments
    ///
    /// * `config` - Pool sizing; `workers` also sets the runtime's thread count
    /// * `jobs` - Number of jobs to submit
    pub fn new(config: PoolConfig, jobs: u64) -> Self {
        Self { config, jobs }
    }
}

impl Scenario for AsyncPoolScenario {
    fn run(&self, output: &mut dyn Write) -> Result<(), String> {
        let config = self.config.sanitized();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.workers)
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let results = runtime.block_on(async {
            let pool = AsyncWorkerPool::new(
                config,
                |payload: i64, _token: CancellationToken| async move { double(payload) },
            );

            let submitter = async {
                let submitted = async {
                    for id in 1..=self.jobs {
                        let payload = i64::try_from(id).map_err(|e| e.to_string())?;
                        pool.submit(Job::new(id, payload))
                            .await
                            .map_err(|e| e.to_string())?;
                    }
                    Ok::<(), String>(())
                }
                .await;
                pool.close();
                submitted
            };
            let receiver = async {
                let mut received = Vec::new();
                while let Ok(result) = pool.recv_result().await {
                    received.push(result);
                }
                received
            };

            let (submitted, mut received) = tokio::join!(submitter, receiver);
            received.extend(pool.shutdown().await);
            submitted.map(|()| received)
        })?;

        if results.len() as u64 != self.jobs {
            return Err(format!("{} jobs produced {} results", self.jobs, results.len()));
        }

        write_job_results_csv(&results, output)
    }
}
