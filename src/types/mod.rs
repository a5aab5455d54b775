//! Types module
//!
//! Contains core data structures used throughout the engine.
//! This module organizes types into logical submodules:
//! - `account`: Account-related types
//! - `transaction`: Ledger-entry types, filters, and transfer metadata
//! - `money`: Fixed-point parse/format helpers
//! - `error`: The closed error taxonomy

pub mod account;
pub mod error;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountId};
pub use error::TransferError;
pub use money::{format_amount, parse_amount, round_money, MONEY_SCALE};
pub use transaction::{
    NewEntry, Transaction, TransactionFilter, TransactionId, TransactionKind, TransferMetadata,
    TransferRole,
};
