//! Thread-based scenarios
//!
//! Each scenario drives one primitive from `actors` OS threads, checks the
//! invariant it is meant to demonstrate, and writes a CSV report through the
//! `csv_format` module.
//!
//! | Scenario             | Primitive             | Report                    |
//! |----------------------|-----------------------|---------------------------|
//! | `CounterScenario`    | `Counter`             | `metric,value` summary    |
//! | `KvScenario`         | `SharedKeyValueStore` | `metric,value` summary    |
//! | `LazyScenario`       | `LazyInitializer`     | `metric,value` summary    |
//! | `LedgerScenario`     | `Ledger`              | `account,balance` rows    |
//! | `ThreadPoolScenario` | `WorkerPool`          | `job,status,output,error` |

use crate::cli::CounterStrategy;
use crate::core::{LazyInitializer, Ledger, PoolConfig, SharedKeyValueStore, WorkerPool};
use crate::io::csv_format::{write_accounts_csv, write_job_results_csv, write_summary_csv};
use crate::scenario::{create_counter, Scenario};
use crate::types::{CoreError, Job};
use rust_decimal::Decimal;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// `actors` threads each increment a shared counter `iterations` times
#[derive(Debug, Clone, Copy)]
pub struct CounterScenario {
    strategy: CounterStrategy,
    actors: usize,
    iterations: usize,
}

impl CounterScenario {
    pub fn new(strategy: CounterStrategy, actors: usize, iterations: usize) -> Self {
        Self {
            strategy,
            actors,
            iterations,
        }
    }
}

impl Scenario for CounterScenario {
    /// Fails if a synchronized counter lost an update. The racy counter is
    /// expected to lose some and only reports how many.
    fn run(&self, output: &mut dyn Write) -> Result<(), String> {
        let counter = create_counter(self.strategy);

        thread::scope(|s| {
            for _ in 0..self.actors {
                s.spawn(|| {
                    for _ in 0..self.iterations {
                        counter.increment();
                    }
                });
            }
        });

        let expected = (self.actors * self.iterations) as i64;
        let actual = counter.value();
        let lost = expected - actual;
        tracing::info!(strategy = ?self.strategy, expected, actual, "counter scenario finished");

        if lost != 0 && self.strategy != CounterStrategy::Racy {
            return Err(format!(
                "{:?} counter lost {} of {} increments",
                self.strategy, lost, expected
            ));
        }

        write_summary_csv(
            &[
                ("counter", format!("{:?}", self.strategy).to_lowercase()),
                ("actors", self.actors.to_string()),
                ("iterations", self.iterations.to_string()),
                ("expected", expected.to_string()),
                ("actual", actual.to_string()),
                ("lost", lost.to_string()),
            ],
            output,
        )
    }
}

/// Writers bump a shared hit counter while readers watch it
///
/// Every actor owns one writer and one reader thread. Writers record their
/// own key and increment `hits` through `update`; readers check that the
/// value they see never goes backwards.
#[derive(Debug, Clone, Copy)]
pub struct KvScenario {
    actors: usize,
    iterations: usize,
}

impl KvScenario {
    pub fn new(actors: usize, iterations: usize) -> Self {
        Self { actors, iterations }
    }
}

impl Scenario for KvScenario {
    fn run(&self, output: &mut dyn Write) -> Result<(), String> {
        let store: SharedKeyValueStore<String, u64> = SharedKeyValueStore::new();
        let reads = AtomicUsize::new(0);
        let regressions = AtomicUsize::new(0);

        let (store, reads, regressions) = (&store, &reads, &regressions);
        thread::scope(|s| {
            for actor in 0..self.actors {
                s.spawn(move || {
                    for _ in 0..self.iterations {
                        store.update("hits".to_string(), |hits| hits.copied().unwrap_or(0) + 1);
                    }
                    store.set(format!("actor-{}", actor), self.iterations as u64);
                });

                s.spawn(move || {
                    let mut last_seen = 0;
                    for _ in 0..self.iterations {
                        let seen = store.get("hits").unwrap_or(0);
                        if seen < last_seen {
                            regressions.fetch_add(1, Ordering::Relaxed);
                        }
                        last_seen = seen;
                        reads.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        let expected = (self.actors * self.iterations) as u64;
        let hits = store.get("hits").unwrap_or(0);
        let regressions = regressions.load(Ordering::Relaxed);

        if hits != expected || regressions != 0 {
            return Err(format!(
                "store saw {} of {} hits with {} backwards reads",
                hits, expected, regressions
            ));
        }

        write_summary_csv(
            &[
                ("entries", store.len() as u64),
                ("hits", hits),
                ("expected_hits", expected),
                ("reads", reads.load(Ordering::Relaxed) as u64),
            ],
            output,
        )
    }
}

/// `actors` callers race to initialize one shared value
#[derive(Debug, Clone, Copy)]
pub struct LazyScenario {
    actors: usize,
}

impl LazyScenario {
    pub fn new(actors: usize) -> Self {
        Self { actors }
    }
}

impl Scenario for LazyScenario {
    fn run(&self, output: &mut dyn Write) -> Result<(), String> {
        let lazy = LazyInitializer::new();
        let invocations = AtomicUsize::new(0);

        let values: Vec<Arc<String>> = thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.actors);
            for _ in 0..self.actors {
                handles.push(s.spawn(|| {
                    lazy.get_or_init(|| {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        "connection-pool".to_string()
                    })
                }));
            }

            handles
                .into_iter()
                .map(|handle| handle.join().map_err(|_| "lazy caller panicked".to_string()))
                .collect::<Result<_, _>>()
        })?;

        let invocations = invocations.into_inner();
        let shared = values.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1]));

        if self.actors > 0 && (invocations != 1 || !shared) {
            return Err(format!(
                "init ran {} times for {} callers (shared result: {})",
                invocations, self.actors, shared
            ));
        }

        write_summary_csv(
            &[
                ("callers", self.actors.to_string()),
                ("invocations", invocations.to_string()),
                ("shared_result", shared.to_string()),
            ],
            output,
        )
    }
}

/// Opposing transfers between two accounts
///
/// Account 1 opens with 1000 and account 2 with 500. `actors` threads move
/// 100 from 1 to 2 while another `actors` threads move 50 back, each
/// `iterations` times. Transfers rejected for insufficient funds are
/// counted; any other error aborts the scenario.
#[derive(Debug, Clone, Copy)]
pub struct LedgerScenario {
    actors: usize,
    iterations: usize,
}

impl LedgerScenario {
    pub fn new(actors: usize, iterations: usize) -> Self {
        Self { actors, iterations }
    }
}

impl Scenario for LedgerScenario {
    fn run(&self, output: &mut dyn Write) -> Result<(), String> {
        let ledger = Ledger::new();
        let a = ledger
            .create_account(Decimal::from(1000))
            .map_err(|e| e.to_string())?;
        let b = ledger
            .create_account(Decimal::from(500))
            .map_err(|e| e.to_string())?;
        let opening_total = ledger.total_balance().map_err(|e| e.to_string())?;
        let rejected = AtomicUsize::new(0);

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.actors * 2);
            for _ in 0..self.actors {
                for (from, to, amount) in [(a, b, 100), (b, a, 50)] {
                    let (ledger, rejected) = (&ledger, &rejected);
                    handles.push(s.spawn(move || {
                        for _ in 0..self.iterations {
                            match ledger.transfer(from, to, Decimal::from(amount)) {
                                Ok(()) => {}
                                Err(CoreError::InsufficientFunds { .. }) => {
                                    rejected.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(e) => return Err(e),
                            }
                        }
                        Ok(())
                    }));
                }
            }

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| "ledger actor panicked".to_string())?
                        .map_err(|e| e.to_string())
                })
                .collect::<Result<(), String>>()
        })?;

        let closing_total = ledger.total_balance().map_err(|e| e.to_string())?;
        tracing::info!(
            rejected = rejected.into_inner(),
            %closing_total,
            "ledger scenario finished"
        );
        if closing_total != opening_total {
            return Err(format!(
                "ledger total changed from {} to {}",
                opening_total, closing_total
            ));
        }

        write_accounts_csv(&ledger.accounts(), output)
    }
}

/// Jobs `1..=jobs` doubling their payload on a thread pool
#[derive(Debug, Clone)]
pub struct ThreadPoolScenario {
    config: PoolConfig,
    jobs: u64,
}

impl ThreadPoolScenario {
    pub fn new(config: PoolConfig, jobs: u64) -> Self {
        Self { config, jobs }
    }
}

impl Scenario for ThreadPoolScenario {
    fn run(&self, output: &mut dyn Write) -> Result<(), String> {
        let pool = WorkerPool::new(self.config.clone(), |payload: i64, _token: &CancellationToken| {
            double(payload)
        });

        // Results are drained while jobs are still being submitted, so a
        // job count above the result queue capacity cannot stall the pool.
        let mut results = thread::scope(|s| {
            let submitter = s.spawn(|| {
                let submitted = submit_all(self.jobs, |job| pool.submit(job));
                pool.close();
                submitted
            });

            let mut received = Vec::new();
            while let Ok(result) = pool.recv_result() {
                received.push(result);
            }

            submitter
                .join()
                .map_err(|_| "pool submitter panicked".to_string())?
                .map(|()| received)
        })?;
        results.extend(pool.shutdown());

        if results.len() as u64 != self.jobs {
            return Err(format!("{} jobs produced {} results", self.jobs, results.len()));
        }

        write_job_results_csv(&results, output)
    }
}

/// Submit jobs `1..=jobs`, each carrying its own id as payload
fn submit_all<F>(jobs: u64, mut submit: F) -> Result<(), String>
where
    F: FnMut(Job<i64>) -> Result<(), CoreError>,
{
    for id in 1..=jobs {
        let payload = i64::try_from(id).map_err(|e| e.to_string())?;
        submit(Job::new(id, payload)).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Job body shared by both pool scenarios
pub(crate) fn double(payload: i64) -> Result<i64, String> {
    payload
        .checked_mul(2)
        .ok_or_else(|| format!("{} overflows when doubled", payload))
}
