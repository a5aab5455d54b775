//! Core traits for account storage and the transaction log
//!
//! This module defines the seams between the transfer engine and its backing
//! store, so the engine can be exercised against the in-memory
//! implementations shipped here or against mocks in tests.

use crate::types::{
    Account, AccountId, NewEntry, Transaction, TransactionFilter, TransactionId, TransferError,
};
use rust_decimal::Decimal;

/// Durable store of accounts with row-level locking
///
/// Balance mutation goes exclusively through [`AccountStore::apply_delta`],
/// a storage-level atomic increment, never an application-side
/// read-modify-write. Exclusive row locks are taken through
/// [`AccountStore::lock_and_fetch`] and held via the returned lease for the
/// duration of one atomic unit.
pub trait AccountStore: Send + Sync {
    /// The lock lease type; dropping it releases every acquired row lock
    type Lease: AccountLease;

    /// Fetch an account snapshot by surrogate id
    fn get(&self, id: AccountId) -> Result<Account, TransferError>;

    /// Fetch an account snapshot by account number
    ///
    /// Reads taken outside a lease are advisory: the authoritative state of
    /// a locked account is the lease's snapshot, and post-delta state is
    /// observed by re-fetching while the lease is still held.
    fn get_by_number(&self, number: &str) -> Result<Account, TransferError>;

    /// Acquire exclusive row locks on the given accounts
    ///
    /// Locks are always taken in ascending surrogate-id order regardless of
    /// the order of `ids`, which makes deadlock impossible when two
    /// concurrent transfers cross the same pair of accounts in opposite
    /// directions. Acquisition is bounded; contention beyond the store's
    /// timeout surfaces as `LockTimeout` (transient).
    fn lock_and_fetch(&self, ids: &[AccountId]) -> Result<Self::Lease, TransferError>;

    /// Atomically add a signed delta to an account's balance
    ///
    /// The increment happens at the storage layer, so it composes with
    /// concurrent non-locking readers without lost updates. When the caller
    /// holds a lease on the account, a subsequent `get` observes the
    /// post-delta value.
    fn apply_delta(&self, id: AccountId, delta: Decimal) -> Result<(), TransferError>;
}

/// Holder of acquired row locks and their authoritative snapshots
pub trait AccountLease {
    /// The snapshot of a locked account, taken after its lock was acquired
    fn account(&self, id: AccountId) -> Option<&Account>;
}

/// Append-only, immutable record store of money movements
pub trait TransactionLog: Send + Sync {
    /// Look up a ledger entry by its unique transaction id
    ///
    /// This is the idempotency lookup and must be an indexed read.
    fn find_by_transaction_id(&self, id: &TransactionId) -> Option<Transaction>;

    /// Append one ledger entry
    ///
    /// Fails with `DuplicateTransactionId` if an entry with the same
    /// transaction id already exists; the engine treats that as the
    /// idempotency signal, not as a hard failure.
    fn append(&self, entry: NewEntry) -> Result<Transaction, TransferError>;

    /// List an account's entries, newest first
    fn list_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
    ) -> Vec<Transaction>;
}
