//! I/O module
//!
//! Handles report output.
//!
//! # Components
//!
//! - `csv_format` - CSV serialization of ledger balances, job results and scenario summaries

pub mod csv_format;

pub use csv_format::{write_accounts_csv, write_job_results_csv, write_summary_csv};
