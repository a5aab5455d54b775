//! In-memory append-only transaction log
//!
//! Entries are immutable once appended. Two indexes back the log's reads:
//! a unique index on transaction id (the idempotency lookup) and a
//! per-account index over append order (the history read). The unique
//! index is the constraint that makes duplicate transaction ids fail at
//! append time.

use crate::core::traits::TransactionLog;
use crate::types::{
    AccountId, NewEntry, Transaction, TransactionFilter, TransactionId, TransferError,
};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of [`TransactionLog`]
pub struct InMemoryTransactionLog {
    /// Unique index: transaction id -> entry
    by_transaction_id: DashMap<TransactionId, Transaction>,
    /// Per-account entries in append order
    by_account: DashMap<AccountId, Vec<Transaction>>,
    next_seq: AtomicU64,
    /// Serializes appends so the uniqueness check and the index writes are
    /// one atomic step.
    append_lock: Mutex<()>,
}

impl InMemoryTransactionLog {
    /// Create an empty log
    pub fn new() -> Self {
        InMemoryTransactionLog {
            by_transaction_id: DashMap::new(),
            by_account: DashMap::new(),
            next_seq: AtomicU64::new(0),
            append_lock: Mutex::new(()),
        }
    }

    /// Total number of entries appended
    pub fn len(&self) -> usize {
        self.by_transaction_id.len()
    }

    /// Whether the log holds no entries
    pub fn is_empty(&self) -> bool {
        self.by_transaction_id.is_empty()
    }
}

impl Default for InMemoryTransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLog for InMemoryTransactionLog {
    fn find_by_transaction_id(&self, id: &TransactionId) -> Option<Transaction> {
        self.by_transaction_id.get(id).map(|entry| entry.clone())
    }

    fn append(&self, entry: NewEntry) -> Result<Transaction, TransferError> {
        let _append = self.append_lock.lock();

        if self.by_transaction_id.contains_key(&entry.transaction_id) {
            return Err(TransferError::duplicate_transaction_id(
                entry.transaction_id,
            ));
        }

        let transaction = Transaction {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed) + 1,
            transaction_id: entry.transaction_id,
            account_id: entry.account_id,
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description,
            created_at: Utc::now(),
            metadata: entry.metadata,
        };

        self.by_transaction_id
            .insert(transaction.transaction_id, transaction.clone());
        self.by_account
            .entry(transaction.account_id)
            .or_default()
            .push(transaction.clone());

        Ok(transaction)
    }

    fn list_for_account(
        &self,
        account_id: AccountId,
        filter: &TransactionFilter,
    ) -> Vec<Transaction> {
        let mut entries: Vec<Transaction> = self
            .by_account
            .get(&account_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| filter.matches(entry))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        entries.reverse();
        entries
    }
}
