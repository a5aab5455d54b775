//! Transfer Engine CLI
//!
//! Command-line interface for replaying funds transfers from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- transfers.csv > accounts.csv
//! cargo run -- --system-account 9990000000 --max-attempts 5 transfers.csv > accounts.csv
//! ```
//!
//! The program reads transfer instructions from the input CSV file, opens
//! accounts on first sight (crediting the welcome bonus), executes each
//! transfer through the engine, and outputs the final account states to
//! stdout. Logs go to stderr; tune them with `RUST_LOG`.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, missing system account, etc.)

use std::process;
use transfer_engine::cli;
use transfer_engine::pipeline;

fn init_tracing() {
    // Logs go to stderr so stdout stays a clean CSV stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = pipeline::run_pipeline(
        &args.input_file,
        &args.system_account,
        args.max_attempts,
        &mut output,
    ) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
