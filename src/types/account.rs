//! Account-related types for the transfer engine
//!
//! This module defines the Account structure representing one row of the
//! account store: a surrogate id, an opaque account number, an optional
//! owner, and a monetary balance.

use rust_decimal::Decimal;
use serde::Serialize;

/// Surrogate account identifier
///
/// Assigned by the account store in ascending order. This is the key used
/// for deterministic lock ordering, so it must be stable for the lifetime
/// of the account.
pub type AccountId = u64;

/// A snapshot of one account's state
///
/// Identity fields (`id`, `number`, `owner`) are immutable once the account
/// is opened. The balance is mutated only through the account store's
/// `apply_delta`, never by writing to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Store-assigned surrogate id, also the lock-ordering key
    pub id: AccountId,

    /// Opaque account number, unique across the store
    ///
    /// Generation of account numbers is the caller's concern; the store
    /// only enforces uniqueness.
    pub number: String,

    /// Owning identity, or `None` for the system fee account
    pub owner: Option<String>,

    /// Current balance, fixed-point with 2 fraction digits
    ///
    /// Non-negativity is enforced at transfer-validation time, not here:
    /// the invariant is that the balance equals the signed sum of all
    /// ledger entries referencing this account plus any out-of-band
    /// credits granted before the ledger existed.
    pub balance: Decimal,
}

impl Account {
    /// Create an account snapshot with a zero balance
    pub fn new(id: AccountId, number: impl Into<String>, owner: Option<String>) -> Self {
        Account {
            id,
            number: number.into(),
            owner,
            balance: Decimal::ZERO,
        }
    }

    /// Whether this is an owner-less system account
    pub fn is_system(&self) -> bool {
        self.owner.is_none()
    }
}
