//! End-to-end integration tests
//!
//! These tests run complete scenarios through the public factory and compare
//! the report with predefined CSV fixtures. Each test:
//! 1. Builds the scenario from its type, mode and settings
//! 2. Runs it, writing the report to a temporary file
//! 3. Compares the file contents with tests/fixtures/{name}/expected.csv
//!
//! Fixtures cover every scenario with deterministic output:
//! - Mutex and atomic counters under contention
//! - Key/value store hit counting
//! - Exactly-once lazy initialization
//! - Opposing ledger transfers
//! - Worker pool doubling
//!
//! `--mode` only affects the pool scenario, so the pool fixture runs in both
//! sync and async mode and the others run once.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_shared_state::cli::{CounterStrategy, Mode, ScenarioType};
    use rust_shared_state::core::PoolConfig;
    use rust_shared_state::scenario::{create_scenario, ScenarioSettings};
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a scenario and compare its report with the fixture's expected.csv
    ///
    /// # Panics
    ///
    /// Panics if the expected file cannot be read, the scenario fails, or the
    /// report doesn't match.
    fn run_test_fixture(
        fixture_name: &str,
        scenario_type: ScenarioType,
        mode: Mode,
        settings: ScenarioSettings,
    ) {
        let expected_path = format!("tests/fixtures/{}/expected.csv", fixture_name);
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let scenario = create_scenario(scenario_type, mode, settings);

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        scenario
            .run(&mut temp_output)
            .unwrap_or_else(|e| panic!("Scenario failed: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (mode: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, mode, actual_output, expected_output
        );
    }

    fn workload(actors: usize, iterations: usize) -> ScenarioSettings {
        ScenarioSettings {
            actors,
            iterations,
            ..ScenarioSettings::default()
        }
    }

    /// End-to-end test for the thread-based scenarios
    #[rstest]
    #[case("counter_mutex", ScenarioType::Counter, workload(10, 1000))]
    #[case(
        "counter_atomic",
        ScenarioType::Counter,
        ScenarioSettings { counter: CounterStrategy::Atomic, ..workload(10, 1000) }
    )]
    #[case("kv_hits", ScenarioType::Kv, workload(4, 250))]
    #[case("lazy_fifty_callers", ScenarioType::Lazy, workload(50, 1))]
    #[case("ledger_opposing_transfers", ScenarioType::Ledger, workload(5, 1))]
    fn test_fixtures(
        #[case] fixture: &str,
        #[case] scenario: ScenarioType,
        #[case] settings: ScenarioSettings,
    ) {
        run_test_fixture(fixture, scenario, Mode::Sync, settings);
    }

    /// End-to-end test for the worker pool in both modes
    #[rstest]
    fn test_pool_fixture(#[values(Mode::Sync, Mode::Async)] mode: Mode) {
        let settings = ScenarioSettings {
            jobs: 5,
            pool: PoolConfig::new(3, 2, 2),
            ..workload(1, 1)
        };

        run_test_fixture("pool_doubling", ScenarioType::Pool, mode, settings);
    }
}
