//! Replay pipeline
//!
//! Drives the engine from a CSV file of transfer instructions: accounts are
//! opened on first sight (with the welcome bonus credited), each instruction
//! is executed with bounded retry of transient faults, and final account
//! states are written as CSV.
//!
//! One malformed row or one failed transfer never aborts the run; fatal
//! configuration faults do.

use crate::core::{EngineConfig, InMemoryAccountStore, InMemoryTransactionLog, TransferEngine};
use crate::io::{write_accounts_csv, InstructionReader};
use crate::types::{Account, TransferError};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Owner label assigned to accounts opened by the replay pipeline
const REPLAY_OWNER: &str = "csv-import";

/// Summary of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// Instructions that committed a transfer (or replayed a committed one)
    pub processed: usize,
    /// Rows that failed to parse or transfers that were rejected
    pub failed: usize,
}

/// Run the replay pipeline end to end
///
/// # Arguments
///
/// * `input` - Path to the instruction CSV
/// * `system_account_number` - Account number of the fee-collecting system
///   account, opened by the pipeline before any transfer runs
/// * `max_attempts` - Attempt bound passed to the engine's retry wrapper
/// * `output` - Destination for the final account-state CSV
///
/// # Errors
///
/// Returns an error string for faults that invalidate the whole run: an
/// unreadable input file, a missing system account, or an output write
/// failure. Per-row failures are logged, counted, and skipped.
pub fn run_pipeline(
    input: &Path,
    system_account_number: &str,
    max_attempts: u32,
    output: &mut dyn Write,
) -> Result<PipelineReport, String> {
    let accounts = Arc::new(InMemoryAccountStore::new());
    let log = Arc::new(InMemoryTransactionLog::new());

    accounts
        .open_account(system_account_number, None)
        .map_err(|e| format!("Failed to open system account: {}", e))?;
    let config = EngineConfig::resolve(accounts.as_ref(), system_account_number)
        .map_err(|e| e.to_string())?;
    let engine = TransferEngine::new(Arc::clone(&accounts), Arc::clone(&log), config)
        .map_err(|e| e.to_string())?;

    let reader = InstructionReader::new(input)?;
    let mut report = PipelineReport {
        processed: 0,
        failed: 0,
    };

    for record in reader {
        let instruction = match record {
            Ok(instruction) => instruction,
            Err(message) => {
                warn!(%message, "skipping malformed instruction row");
                report.failed += 1;
                continue;
            }
        };

        let sender = ensure_account(&accounts, &engine, &instruction.from)?;
        ensure_account(&accounts, &engine, &instruction.to)?;

        match engine.execute_transfer_with_retry(
            &sender,
            &instruction.to,
            instruction.amount,
            instruction.idempotency_id,
            max_attempts,
        ) {
            Ok(_) => report.processed += 1,
            Err(fault) if fault.is_fatal() => {
                return Err(fault.to_string());
            }
            Err(fault) => {
                warn!(
                    from = %instruction.from,
                    to = %instruction.to,
                    amount = %instruction.amount,
                    %fault,
                    "transfer rejected"
                );
                report.failed += 1;
            }
        }
    }

    write_accounts_csv(&accounts.all_accounts(), output)?;
    info!(
        processed = report.processed,
        failed = report.failed,
        "replay pipeline finished"
    );
    Ok(report)
}

/// Fetch an account by number, opening it with the welcome bonus on first
/// sight
fn ensure_account(
    accounts: &Arc<InMemoryAccountStore>,
    engine: &TransferEngine<InMemoryAccountStore, InMemoryTransactionLog>,
    number: &str,
) -> Result<Account, String> {
    use crate::core::AccountStore;

    if let Ok(account) = accounts.get_by_number(number) {
        return Ok(account);
    }

    match accounts.open_account(number, Some(REPLAY_OWNER)) {
        Ok(account) => {
            engine
                .grant_welcome_bonus(&account)
                .map_err(|e| e.to_string())?;
            // Re-read so the snapshot reflects the bonus.
            accounts.get(account.id).map_err(|e| e.to_string())
        }
        // Lost a race to open the same number; the winner's account is the
        // one to use.
        Err(TransferError::AccountNumberTaken { .. }) => {
            accounts.get_by_number(number).map_err(|e| e.to_string())
        }
        Err(fault) => Err(fault.to_string()),
    }
}
