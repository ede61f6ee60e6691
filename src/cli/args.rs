use crate::core::PoolConfig;
use crate::scenario::ScenarioSettings;
use clap::{Parser, ValueEnum};

/// Run shared-state concurrency scenarios
#[derive(Parser, Debug)]
#[command(name = "shared-state")]
#[command(about = "Run shared-state concurrency scenarios", long_about = None)]
pub struct CliArgs {
    /// Scenario to run
    #[arg(value_name = "SCENARIO", help = "Scenario: counter, kv, lazy, ledger or pool")]
    pub scenario: ScenarioType,

    /// Execution mode for the worker pool scenario
    #[arg(
        long = "mode",
        value_name = "MODE",
        default_value = "sync",
        help = "Pool mode: 'sync' for OS threads or 'async' for tokio tasks"
    )]
    pub mode: Mode,

    /// Counter implementation for the counter scenario
    #[arg(
        long = "counter",
        value_name = "COUNTER",
        default_value = "mutex",
        help = "Counter implementation: 'mutex', 'atomic' or 'racy'"
    )]
    pub counter: CounterStrategy,

    /// Number of concurrent actors
    #[arg(
        long = "actors",
        value_name = "COUNT",
        default_value_t = 10,
        help = "Number of concurrent threads driving the scenario"
    )]
    pub actors: usize,

    /// Operations per actor
    #[arg(
        long = "iterations",
        value_name = "COUNT",
        default_value_t = 1000,
        help = "Operations performed by each actor"
    )]
    pub iterations: usize,

    /// Number of pool workers (pool scenario only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of pool workers (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Job queue capacity (pool scenario only)
    #[arg(
        long = "queue-capacity",
        value_name = "SIZE",
        help = "Capacity of the job and result queues (default: 100)"
    )]
    pub queue_capacity: Option<usize>,

    /// Number of jobs to submit (pool scenario only)
    #[arg(
        long = "jobs",
        value_name = "COUNT",
        default_value_t = 20,
        help = "Number of jobs submitted to the pool"
    )]
    pub jobs: u64,
}

/// Available scenarios
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScenarioType {
    Counter,
    Kv,
    Lazy,
    Ledger,
    Pool,
}

/// Worker pool execution mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Sync,
    Async,
}

/// Available counter implementations
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CounterStrategy {
    Mutex,
    Atomic,
    Racy,
}

impl CliArgs {
    /// Create a PoolConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults. Zero values are replaced by
    /// the defaults with a warning, see [`PoolConfig::new`].
    pub fn to_pool_config(&self) -> PoolConfig {
        if self.workers.is_none() && self.queue_capacity.is_none() {
            return PoolConfig::default();
        }

        let default = PoolConfig::default();
        let capacity = self.queue_capacity.unwrap_or(default.queue_capacity);
        PoolConfig::new(self.workers.unwrap_or(default.workers), capacity, capacity)
    }

    /// Collect the workload knobs for [`crate::scenario::create_scenario`]
    pub fn to_settings(&self) -> ScenarioSettings {
        ScenarioSettings {
            counter: self.counter,
            actors: self.actors,
            iterations: self.iterations,
            jobs: self.jobs,
            pool: self.to_pool_config(),
        }
    }
}
