//! Core engine module
//!
//! Contains the transfer engine, the fee policy, the storage seams, and the
//! in-memory store and log implementations:
//! - `traits`: The `AccountStore` / `TransactionLog` seams
//! - `fees`: The fee schedule
//! - `account_store`: In-memory accounts with row-level locking
//! - `transaction_log`: In-memory append-only ledger
//! - `engine`: The transfer engine itself

pub mod account_store;
pub mod engine;
pub mod fees;
pub mod traits;
pub mod transaction_log;

pub use account_store::{AccountRowLease, InMemoryAccountStore, DEFAULT_LOCK_TIMEOUT};
pub use engine::{EngineConfig, TransferEngine, TransferResult, WELCOME_BONUS};
pub use fees::FeeSchedule;
pub use traits::{AccountLease, AccountStore, TransactionLog};
pub use transaction_log::InMemoryTransactionLog;
