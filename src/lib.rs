//! Transfer Engine Library
//! # Overview
//!
//! This library provides a ledger-backed funds-transfer engine: each
//! transfer atomically debits the sender by amount plus fee, credits the
//! recipient, credits a system fee account, and records three immutable
//! ledger entries. Retried submissions carrying the same idempotency id
//! return the originally committed result instead of moving money twice.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Transaction, errors, money helpers)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - The transfer engine and its configuration
//!   - [`core::fees`] - The fee schedule
//!   - [`core::account_store`] - Accounts with row-level locking
//!   - [`core::transaction_log`] - The append-only ledger
//! - [`io`] - CSV parsing and output for the replay driver
//! - [`pipeline`] - End-to-end replay orchestration
//!
//! # Concurrency
//!
//! A single engine instance is shared across threads behind an `Arc`. Row
//! locks are always acquired in ascending account-id order, so concurrent
//! transfers crossing the same accounts in opposite directions cannot
//! deadlock. Lock acquisition is bounded; timeouts surface as a transient
//! fault that the retry wrapper resubmits with the same idempotency id.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

pub use crate::core::{
    EngineConfig, FeeSchedule, InMemoryAccountStore, InMemoryTransactionLog, TransferEngine,
    TransferResult,
};
pub use io::write_accounts_csv;
pub use pipeline::{run_pipeline, PipelineReport};
pub use types::{
    Account, AccountId, Transaction, TransactionFilter, TransactionId, TransactionKind,
    TransferError,
};
