//! Error types for the transfer engine
//!
//! The engine's failure modes form a closed set of tagged variants carrying
//! structured fields, so calling layers can format or localize messages
//! themselves instead of parsing pre-built strings.
//!
//! # Error Categories
//!
//! - **Business-rule failures**: deterministic, caller-facing, safe to
//!   retry after correcting input (InvalidAmount, AccountNotFound,
//!   SelfTransfer, InsufficientFunds).
//! - **Transient faults**: lock acquisition timed out; safe to retry the
//!   call unchanged (LockTimeout).
//! - **Idempotency signal**: a unique-constraint collision on a transaction
//!   id; resolved internally by a replay read, never shown to callers
//!   (DuplicateTransactionId).
//! - **Fatal configuration faults**: the system fee account is missing;
//!   not caller-recoverable (SystemAccountMissing).
//! - **Invariant breaches**: internal store inconsistencies that indicate a
//!   bug rather than bad input.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::AccountId;
use super::transaction::TransactionId;

/// Main error type for the transfer engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransferError {
    /// Transfer or fee amount was zero or negative
    #[error("Transfer amount must be positive, got {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// No account exists with the given account number
    #[error("Account {number} not found")]
    AccountNotFound {
        /// The account number that was looked up
        number: String,
    },

    /// Sender and recipient resolved to the same account
    #[error("Cannot transfer to yourself")]
    SelfTransfer {
        /// The account number both parties resolved to
        number: String,
    },

    /// Sender balance cannot cover amount + fee
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount + fee the transfer would debit
        required: Decimal,
        /// The sender's balance at check time
        available: Decimal,
    },

    /// The configured system fee account does not exist
    ///
    /// A deployment/configuration fault, not a user-facing error. Must not
    /// be silently retried.
    #[error("System fee account is missing")]
    SystemAccountMissing,

    /// A ledger entry with this transaction id already exists
    ///
    /// This is the idempotency signal: the engine resolves it by reading
    /// back the committed entry instead of failing the operation.
    #[error("Transaction id {transaction_id} already exists")]
    DuplicateTransactionId {
        /// The colliding transaction id
        transaction_id: TransactionId,
    },

    /// A row lock could not be acquired within the store's timeout
    ///
    /// Transient; the caller (or the retry wrapper) may resubmit unchanged.
    #[error("Timed out waiting for lock on account {account_id}")]
    LockTimeout {
        /// The account whose row lock was contended
        account_id: AccountId,
    },

    /// An account id that should exist was not found in the store
    #[error("Account id {id} is not present in the store")]
    UnknownAccount {
        /// The missing surrogate id
        id: AccountId,
    },

    /// An account with this number already exists
    #[error("Account number {number} is already taken")]
    AccountNumberTaken {
        /// The duplicate account number
        number: String,
    },

    /// A balance mutation would overflow the decimal representation
    #[error("Arithmetic overflow updating balance of account {account_id}")]
    ArithmeticOverflow {
        /// The account whose balance update overflowed
        account_id: AccountId,
    },

    /// A ledger entry's metadata could not be parsed during replay
    #[error("Ledger entry {transaction_id} has malformed transfer metadata")]
    InvalidMetadata {
        /// The entry whose metadata failed to parse
        transaction_id: TransactionId,
    },
}

impl TransferError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        TransferError::InvalidAmount { amount }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(number: &str) -> Self {
        TransferError::AccountNotFound {
            number: number.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        TransferError::InsufficientFunds {
            required,
            available,
        }
    }

    /// Create a DuplicateTransactionId error
    pub fn duplicate_transaction_id(transaction_id: TransactionId) -> Self {
        TransferError::DuplicateTransactionId { transaction_id }
    }

    /// Whether this is a deterministic business-rule failure
    ///
    /// Business failures are safe to report verbatim to callers, who can
    /// retry after correcting their input.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidAmount { .. }
                | TransferError::AccountNotFound { .. }
                | TransferError::SelfTransfer { .. }
                | TransferError::InsufficientFunds { .. }
        )
    }

    /// Whether this failure is transient and safe to retry unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, TransferError::LockTimeout { .. })
    }

    /// Whether this is a fatal configuration fault
    ///
    /// Fatal faults must propagate loudly and must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransferError::SystemAccountMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case::invalid_amount(
        TransferError::InvalidAmount { amount: Decimal::new(-10000, 2) },
        "Transfer amount must be positive, got -100.00"
    )]
    #[case::account_not_found(
        TransferError::AccountNotFound { number: "9999999999".to_string() },
        "Account 9999999999 not found"
    )]
    #[case::self_transfer(
        TransferError::SelfTransfer { number: "1234567890".to_string() },
        "Cannot transfer to yourself"
    )]
    #[case::insufficient_funds(
        TransferError::InsufficientFunds {
            required: Decimal::new(102500, 2),
            available: Decimal::new(100000, 2),
        },
        "Insufficient funds: required 1025.00, available 1000.00"
    )]
    #[case::system_account_missing(
        TransferError::SystemAccountMissing,
        "System fee account is missing"
    )]
    fn test_error_display(#[case] error: TransferError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_amount(TransferError::invalid_amount(Decimal::ZERO), true, false, false)]
    #[case::not_found(TransferError::account_not_found("1"), true, false, false)]
    #[case::insufficient(
        TransferError::insufficient_funds(Decimal::ONE, Decimal::ZERO),
        true,
        false,
        false
    )]
    #[case::lock_timeout(TransferError::LockTimeout { account_id: 1 }, false, true, false)]
    #[case::system_missing(TransferError::SystemAccountMissing, false, false, true)]
    fn test_classification(
        #[case] error: TransferError,
        #[case] business: bool,
        #[case] transient: bool,
        #[case] fatal: bool,
    ) {
        assert_eq!(error.is_business(), business);
        assert_eq!(error.is_transient(), transient);
        assert_eq!(error.is_fatal(), fatal);
    }

    #[test]
    fn test_duplicate_is_neither_business_nor_transient() {
        let error = TransferError::duplicate_transaction_id(Uuid::new_v4());
        assert!(!error.is_business());
        assert!(!error.is_transient());
        assert!(!error.is_fatal());
    }
}
