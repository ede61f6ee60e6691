//! CSV format handling for scenario reports
//!
//! This module centralizes all CSV output concerns:
//! - Ledger balances (`account,balance`)
//! - Worker pool results (`job,status,output,error`)
//! - Two-column summaries (`metric,value`) used by the other scenarios
//!
//! Rows are sorted before writing so reports are deterministic regardless
//! of the order concurrent workers finished in.

use crate::types::{AccountId, AccountSnapshot, JobId, JobResult};
use csv::{Writer, WriterBuilder};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

/// One `account,balance` row
#[derive(Debug, Serialize)]
struct AccountRow {
    account: AccountId,
    balance: String,
}

impl From<&AccountSnapshot> for AccountRow {
    fn from(snapshot: &AccountSnapshot) -> Self {
        AccountRow {
            account: snapshot.id,
            balance: format_balance(snapshot.balance),
        }
    }
}

/// One `job,status,output,error` row
#[derive(Debug, Serialize)]
struct JobRow {
    job: JobId,
    status: &'static str,
    output: Option<String>,
    error: Option<String>,
}

impl<O: Display> From<&JobResult<O>> for JobRow {
    fn from(result: &JobResult<O>) -> Self {
        match &result.outcome {
            Ok(value) => JobRow {
                job: result.job,
                status: "ok",
                output: Some(value.to_string()),
                error: None,
            },
            Err(e) => JobRow {
                job: result.job,
                status: "failed",
                output: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Round half away from zero to four places, then pad to four places
fn format_balance(balance: Decimal) -> String {
    format!(
        "{:.4}",
        balance.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Writer with the header written up front, so empty reports keep it
fn writer_with_header<'a>(
    output: &'a mut dyn Write,
    header: &[&str],
) -> Result<Writer<&'a mut dyn Write>, String> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(output);
    writer
        .write_record(header)
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;
    Ok(writer)
}

/// Write account balances to output in CSV format
///
/// Rows are sorted by account id. Balances are rounded half away from zero
/// to four decimal places.
///
/// # Errors
///
/// Returns an error message if writing or flushing fails.
pub fn write_accounts_csv(accounts: &[AccountSnapshot], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = writer_with_header(output, &["account", "balance"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in &sorted_accounts {
        writer
            .serialize(AccountRow::from(account))
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write worker pool results to output in CSV format
///
/// Rows are sorted by job id. Successful jobs fill `output`, failed ones
/// fill `error`; the other column is left empty.
///
/// # Errors
///
/// Returns an error message if writing or flushing fails.
pub fn write_job_results_csv<O: Display>(
    results: &[JobResult<O>],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = writer_with_header(output, &["job", "status", "output", "error"])?;

    let mut sorted: Vec<&JobResult<O>> = results.iter().collect();
    sorted.sort_by_key(|result| result.job);

    for result in sorted {
        writer
            .serialize(JobRow::from(result))
            .map_err(|e| format!("Failed to write job record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write `metric,value` rows in the given order
///
/// # Errors
///
/// Returns an error message if writing or flushing fails.
pub fn write_summary_csv<V: Display>(rows: &[(&str, V)], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = writer_with_header(output, &["metric", "value"])?;

    for (metric, value) in rows {
        writer
            .write_record(&[metric.to_string(), value.to_string()])
            .map_err(|e| format!("Failed to write summary record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
