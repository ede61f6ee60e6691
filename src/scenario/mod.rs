//! Scenario module for runnable demonstrations
//!
//! This module defines the Strategy pattern for the CLI: each scenario sets
//! up one shared-state primitive, drives it from many threads or tasks, and
//! writes a CSV report. Scenarios are selected at runtime from the parsed
//! arguments.

use crate::cli::{CounterStrategy, Mode, ScenarioType};
use crate::core::{AtomicCounter, Counter, MutexCounter, PoolConfig, RacyCounter};
use std::io::Write;

pub mod r#async;
pub mod sync;

pub use self::r#async::AsyncPoolScenario;
pub use sync::{CounterScenario, KvScenario, LazyScenario, LedgerScenario, ThreadPoolScenario};

/// Runnable demonstration writing a report to output
pub trait Scenario: Send + Sync {
    /// Run the scenario to completion and write its report
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario could not be set up (for example the
    /// tokio runtime failed to start), if one of its invariants did not hold,
    /// or if the report could not be written.
    fn run(&self, output: &mut dyn Write) -> Result<(), String>;
}

/// Workload knobs shared by every scenario
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioSettings {
    /// Counter implementation used by the counter scenario
    pub counter: CounterStrategy,
    /// Number of concurrent threads driving the scenario
    pub actors: usize,
    /// Operations per actor
    pub iterations: usize,
    /// Number of jobs fed to the pool scenario
    pub jobs: u64,
    /// Pool sizing for the pool scenario
    pub pool: PoolConfig,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            counter: CounterStrategy::Mutex,
            actors: 10,
            iterations: 1000,
            jobs: 20,
            pool: PoolConfig::default(),
        }
    }
}

/// Create a scenario from its type, mode and settings
///
/// `mode` only affects the pool scenario; the other primitives are
/// thread-based.
pub fn create_scenario(
    scenario: ScenarioType,
    mode: Mode,
    settings: ScenarioSettings,
) -> Box<dyn Scenario> {
    match scenario {
        ScenarioType::Counter => Box::new(CounterScenario::new(
            settings.counter,
            settings.actors,
            settings.iterations,
        )),
        ScenarioType::Kv => Box::new(KvScenario::new(settings.actors, settings.iterations)),
        ScenarioType::Lazy => Box::new(LazyScenario::new(settings.actors)),
        ScenarioType::Ledger => Box::new(LedgerScenario::new(settings.actors, settings.iterations)),
        ScenarioType::Pool => match mode {
            Mode::Sync => Box::new(ThreadPoolScenario::new(settings.pool, settings.jobs)),
            Mode::Async => Box::new(AsyncPoolScenario::new(settings.pool, settings.jobs)),
        },
    }
}

/// Create a counter of the requested kind
pub fn create_counter(strategy: CounterStrategy) -> Box<dyn Counter> {
    match strategy {
        CounterStrategy::Mutex => Box::new(MutexCounter::new()),
        CounterStrategy::Atomic => Box::new(AtomicCounter::new()),
        CounterStrategy::Racy => Box::new(RacyCounter::new()),
    }
}
