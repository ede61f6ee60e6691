//! Shared-state scenarios CLI
//!
//! Command-line interface for running the concurrency scenarios.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- counter --counter atomic --actors 10 --iterations 1000
//! cargo run -- ledger --actors 5 --iterations 1 > balances.csv
//! cargo run -- pool --mode async --workers 3 --queue-capacity 2 --jobs 5 > results.csv
//! RUST_LOG=debug cargo run -- lazy --actors 50
//! ```
//!
//! The report of the selected scenario goes to stdout as CSV. Logs go to
//! stderr and are filtered through `RUST_LOG` (default `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (scenario invariant violated, runtime failure, output not writable)

use rust_shared_state::cli;
use rust_shared_state::scenario;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = cli::parse_args();

    let scenario = scenario::create_scenario(args.scenario, args.mode, args.to_settings());

    let mut output = std::io::stdout();
    if let Err(e) = scenario.run(&mut output) {
        tracing::error!("scenario {:?} failed: {}", args.scenario, e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
