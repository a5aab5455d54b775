//! Ledger-entry types for the transfer engine
//!
//! This module defines the immutable ledger entry (`Transaction`), the input
//! record used to append one (`NewEntry`), the history filter, and the typed
//! view of the denormalized transfer metadata blob.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountId;

/// Unique, idempotency-relevant transaction identifier
///
/// Caller-supplied for the sender entry of a transfer (the operation id) or
/// engine-generated otherwise. A UUID keeps generation coordination-free.
pub type TransactionId = Uuid;

/// Signed-effect classification of a ledger entry
///
/// The entry's amount is always positive; whether it increases or decreases
/// the account's balance is carried here, not by the number's sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Funds received from a counterparty
    Credit,
    /// Funds sent to a counterparty (amount includes the fee for transfers)
    Debit,
    /// Out-of-band credit, e.g. the welcome bonus granted on signup
    Bonus,
    /// Transfer fee credited to the system account
    Fee,
}

impl TransactionKind {
    /// Signed multiplier this kind applies to an account balance
    pub fn sign(&self) -> Decimal {
        match self {
            TransactionKind::Credit | TransactionKind::Bonus | TransactionKind::Fee => {
                Decimal::ONE
            }
            TransactionKind::Debit => Decimal::NEGATIVE_ONE,
        }
    }
}

/// One immutable money movement against one account
///
/// Created exactly once per logical effect, inside the transfer's atomic
/// scope; never updated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// System-wide surrogate, assigned by the log in append order
    pub seq: u64,

    /// Unique transaction identifier (see [`TransactionId`])
    pub transaction_id: TransactionId,

    /// The account this entry is booked against
    pub account_id: AccountId,

    /// Signed-effect classification
    pub kind: TransactionKind,

    /// Monetary amount, always positive
    pub amount: Decimal,

    /// Free-text description
    pub description: String,

    /// Creation timestamp, assigned by the log
    pub created_at: DateTime<Utc>,

    /// Open metadata map
    ///
    /// For transfer entries this holds the denormalized cross-references
    /// (see [`TransferMetadata`]) so an idempotent replay never needs to
    /// join across the operation's other entries. `Null` for entries that
    /// carry no metadata, such as bonus grants.
    pub metadata: serde_json::Value,
}

/// Input record for appending one ledger entry
///
/// The log assigns `seq` and `created_at`; everything else is supplied by
/// the engine.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub metadata: serde_json::Value,
}

/// History filter for `list_for_account`
///
/// Bounds are inclusive; `None` leaves that dimension unconstrained.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionKind>,
}

impl TransactionFilter {
    /// Whether the given entry passes this filter
    pub fn matches(&self, entry: &Transaction) -> bool {
        if let Some(from) = self.from {
            if entry.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.created_at > to {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        true
    }
}

/// Role an entry plays within a transfer operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferRole {
    Sender,
    Receiver,
    Fee,
}

/// Typed view of the metadata blob stored on transfer ledger entries
///
/// All three entries of one operation carry the same cross-references
/// (operation id, receiver and fee transaction ids), so any single entry is
/// enough to answer a replay. Amounts are stored as canonical 2-fraction-
/// digit decimal strings to keep replayed results byte-identical to the
/// original response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferMetadata {
    /// Operation marker, always `"transfer"`
    pub operation: String,

    /// The operation id (equal to the sender entry's transaction id)
    pub operation_id: TransactionId,

    /// Transaction id of the receiver's credit entry
    pub receiver_txn_id: TransactionId,

    /// Transaction id of the system account's fee entry
    pub fee_txn_id: TransactionId,

    /// This entry's role in the operation
    pub role: TransferRole,

    /// Counterparty account number (absent on the fee entry, which names
    /// both parties explicitly)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty_account: Option<String>,

    /// Sender account number (fee entry only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_account: Option<String>,

    /// Receiver account number (fee entry only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_account: Option<String>,

    /// The transfer amount (excluding fee)
    pub transfer_amount: String,

    /// The fee charged (sender and fee entries)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,

    /// Amount + fee debited from the sender (sender entry only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_debited: Option<String>,

    /// This entry's account balance before the operation
    pub balance_before: String,

    /// This entry's account balance after the operation
    pub balance_after: String,
}

impl TransferMetadata {
    /// Serialize into the open metadata map stored on the ledger entry
    pub fn to_value(&self) -> serde_json::Value {
        // Serialization of this struct cannot fail: every field is a
        // string, option of string, or UUID.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Parse the metadata map of a ledger entry back into the typed view
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
