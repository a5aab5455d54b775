//! In-memory account store with row-level locking
//!
//! Stands in for the single transactional data store the engine is designed
//! against. Each account cell carries two independent pieces of state:
//!
//! - a **row lock** (`parking_lot::Mutex`), the equivalent of an exclusive
//!   row lock, held across one atomic unit via an owned guard;
//! - a **balance cell** (`parking_lot::RwLock<Decimal>`), mutated only by
//!   storage-level atomic deltas so non-locking readers never observe a
//!   torn update.
//!
//! Keeping the two separate is what lets `apply_delta` run while the caller
//! still holds the row lock, mirroring how an UPDATE composes with a
//! FOR UPDATE lock inside one database transaction.

use crate::core::traits::{AccountLease, AccountStore};
use crate::types::{Account, AccountId, TransferError};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Owned row-lock guard; releases the lock when dropped
type RowGuard = parking_lot::lock_api::ArcMutexGuard<parking_lot::RawMutex, ()>;

/// One account row: immutable identity plus lock and balance cells
struct AccountCell {
    id: AccountId,
    number: String,
    owner: Option<String>,
    balance: RwLock<Decimal>,
    row: Arc<Mutex<()>>,
}

impl AccountCell {
    fn snapshot(&self) -> Account {
        Account {
            id: self.id,
            number: self.number.clone(),
            owner: self.owner.clone(),
            balance: *self.balance.read(),
        }
    }
}

/// In-memory implementation of [`AccountStore`]
///
/// Accounts are kept in a concurrent map keyed by surrogate id, with a
/// secondary index from account number to id. Surrogate ids are assigned in
/// ascending order and double as the global lock-ordering key.
pub struct InMemoryAccountStore {
    cells: DashMap<AccountId, Arc<AccountCell>>,
    numbers: DashMap<String, AccountId>,
    next_id: AtomicU64,
    lock_timeout: Duration,
}

/// Default bound on row-lock acquisition
///
/// Contention beyond this surfaces as the transient `LockTimeout` fault,
/// standing in for the backing store's own deadlock/timeout detection.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

impl InMemoryAccountStore {
    /// Create an empty store with the default lock timeout
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store with a custom lock timeout
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        InMemoryAccountStore {
            cells: DashMap::new(),
            numbers: DashMap::new(),
            next_id: AtomicU64::new(0),
            lock_timeout,
        }
    }

    /// Open a new account with a zero balance
    ///
    /// The account number is caller-supplied (number generation is an
    /// external concern); the store enforces its uniqueness and assigns the
    /// next surrogate id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNumberTaken` if an account with this number already
    /// exists.
    pub fn open_account(
        &self,
        number: &str,
        owner: Option<&str>,
    ) -> Result<Account, TransferError> {
        match self.numbers.entry(number.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(TransferError::AccountNumberTaken {
                number: number.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(vacancy) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let cell = Arc::new(AccountCell {
                    id,
                    number: number.to_string(),
                    owner: owner.map(|o| o.to_string()),
                    balance: RwLock::new(Decimal::ZERO),
                    row: Arc::new(Mutex::new(())),
                });
                let snapshot = cell.snapshot();
                self.cells.insert(id, cell);
                vacancy.insert(id);
                Ok(snapshot)
            }
        }
    }

    /// All account snapshots, sorted by account number
    pub fn all_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .cells
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        accounts
    }

    fn cell(&self, id: AccountId) -> Result<Arc<AccountCell>, TransferError> {
        self.cells
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(TransferError::UnknownAccount { id })
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Lease over a set of locked account rows
///
/// Holds the owned row-lock guards and the snapshots taken after every lock
/// was acquired. Dropping the lease releases all locks.
pub struct AccountRowLease {
    accounts: Vec<Account>,
    _guards: Vec<RowGuard>,
}

impl std::fmt::Debug for AccountRowLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRowLease")
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

impl AccountLease for AccountRowLease {
    fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }
}

impl AccountStore for InMemoryAccountStore {
    type Lease = AccountRowLease;

    fn get(&self, id: AccountId) -> Result<Account, TransferError> {
        Ok(self.cell(id)?.snapshot())
    }

    fn get_by_number(&self, number: &str) -> Result<Account, TransferError> {
        let id = self
            .numbers
            .get(number)
            .map(|entry| *entry.value())
            .ok_or_else(|| TransferError::account_not_found(number))?;
        self.get(id)
            .map_err(|_| TransferError::account_not_found(number))
    }

    fn lock_and_fetch(&self, ids: &[AccountId]) -> Result<Self::Lease, TransferError> {
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        // Resolve every cell before blocking on any lock, so a missing
        // account never leaves locks half-acquired.
        let mut cells = Vec::with_capacity(sorted.len());
        for id in &sorted {
            cells.push(self.cell(*id)?);
        }

        let mut guards = Vec::with_capacity(cells.len());
        for cell in &cells {
            let guard = cell
                .row
                .try_lock_arc_for(self.lock_timeout)
                .ok_or(TransferError::LockTimeout {
                    account_id: cell.id,
                })?;
            guards.push(guard);
        }

        // Snapshots are authoritative only because they are taken after all
        // locks are held.
        let accounts = cells.iter().map(|cell| cell.snapshot()).collect();

        Ok(AccountRowLease {
            accounts,
            _guards: guards,
        })
    }

    fn apply_delta(&self, id: AccountId, delta: Decimal) -> Result<(), TransferError> {
        let cell = self.cell(id)?;
        let mut balance = cell.balance.write();
        *balance = balance
            .checked_add(delta)
            .ok_or(TransferError::ArithmeticOverflow { account_id: id })?;
        Ok(())
    }
}
