use clap::Parser;
use std::path::PathBuf;

/// Default account number for the fee-collecting system account
pub const DEFAULT_SYSTEM_ACCOUNT: &str = "0000000001";

/// Default attempt bound for transient-fault retries
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Replay funds transfers from a CSV instruction file
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(about = "Replay funds transfers from a CSV instruction file", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing transfer instructions
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Account number of the system account that collects fees
    #[arg(
        long = "system-account",
        value_name = "NUMBER",
        default_value = DEFAULT_SYSTEM_ACCOUNT,
        help = "Account number of the fee-collecting system account"
    )]
    pub system_account: String,

    /// Maximum attempts per transfer when transient faults strike
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        help = "Attempt bound for retrying lock timeouts"
    )]
    pub max_attempts: u32,
}
