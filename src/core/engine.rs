//! The transfer engine
//!
//! Implements the atomic funds-transfer operation: debit the sender by
//! amount plus fee, credit the recipient, credit the system fee account, and
//! record three immutable ledger entries, all inside one locked scope.
//! Retried submissions carrying the same idempotency id return the
//! originally committed result instead of moving money twice.

use crate::core::fees::FeeSchedule;
use crate::core::traits::{AccountLease, AccountStore, TransactionLog};
use crate::types::{
    format_amount, round_money, Account, AccountId, NewEntry, Transaction, TransactionFilter,
    TransactionId, TransactionKind, TransferError, TransferMetadata, TransferRole,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Welcome bonus credited when an account is opened
pub const WELCOME_BONUS: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 2);

/// Attempts at drawing an unused entry id before giving up on pre-checking
const MAX_ID_ATTEMPTS: usize = 8;

/// Engine configuration, resolved once at startup
///
/// The system fee account is resolved to its surrogate id here rather than
/// looked up by number on every transfer, so a misconfigured deployment
/// fails at boot instead of on the first fee credit.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Surrogate id of the system account that collects fees
    pub system_account: AccountId,
    /// Fee policy applied to every transfer
    pub fees: FeeSchedule,
    /// Bonus credited to newly opened accounts
    pub welcome_bonus: Decimal,
}

impl EngineConfig {
    /// Resolve the configuration against the account store
    ///
    /// # Errors
    ///
    /// Returns `SystemAccountMissing` if no account exists with the given
    /// system account number.
    pub fn resolve<S: AccountStore>(
        store: &S,
        system_account_number: &str,
    ) -> Result<Self, TransferError> {
        let system = store
            .get_by_number(system_account_number)
            .map_err(|_| TransferError::SystemAccountMissing)?;
        Ok(EngineConfig {
            system_account: system.id,
            fees: FeeSchedule::default(),
            welcome_bonus: WELCOME_BONUS,
        })
    }
}

/// Caller-facing summary of one committed transfer
///
/// Amounts are canonical 2-fraction-digit strings so a replayed result is
/// byte-identical to the original one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferResult {
    /// The idempotency id of the operation (also the sender entry's id)
    pub operation_id: TransactionId,
    pub sender_transaction_id: TransactionId,
    pub receiver_transaction_id: TransactionId,
    pub fee_transaction_id: TransactionId,
    pub sender_account: String,
    pub receiver_account: String,
    pub amount: String,
    pub fee: String,
    pub total_debited: String,
    pub sender_balance_before: String,
    pub sender_balance_after: String,
}

/// The funds-transfer engine
///
/// Generic over its storage seams so tests can substitute either side. The
/// engine itself is stateless apart from configuration; a single instance is
/// shared across request threads behind an `Arc`.
pub struct TransferEngine<S: AccountStore, L: TransactionLog> {
    accounts: Arc<S>,
    log: Arc<L>,
    config: EngineConfig,
}

impl<S: AccountStore, L: TransactionLog> std::fmt::Debug for TransferEngine<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: AccountStore, L: TransactionLog> TransferEngine<S, L> {
    /// Create an engine over the given store and log
    ///
    /// # Errors
    ///
    /// Returns `SystemAccountMissing` if the configured system account id
    /// does not resolve.
    pub fn new(
        accounts: Arc<S>,
        log: Arc<L>,
        config: EngineConfig,
    ) -> Result<Self, TransferError> {
        if accounts.get(config.system_account).is_err() {
            error!(
                system_account = config.system_account,
                "configured system fee account does not exist"
            );
            return Err(TransferError::SystemAccountMissing);
        }
        Ok(TransferEngine {
            accounts,
            log,
            config,
        })
    }

    /// The resolved configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one transfer from `sender` to the account numbered
    /// `to_account_number`
    ///
    /// The operation debits the sender by amount plus fee, credits the
    /// recipient with the amount, credits the system account with the fee,
    /// and appends three ledger entries, atomically. Submitting the same
    /// `idempotency_id` again returns the originally committed result.
    ///
    /// # Arguments
    ///
    /// * `sender` - Snapshot of the sending account (identity only; its
    ///   balance is re-read under lock)
    /// * `to_account_number` - Account number of the recipient
    /// * `amount` - Transfer amount, positive, at most 2 fraction digits
    /// * `idempotency_id` - Caller-supplied operation id; `None` generates
    ///   a fresh one (the call is then not replay-safe)
    ///
    /// # Errors
    ///
    /// Business failures (`InvalidAmount`, `AccountNotFound`,
    /// `SelfTransfer`, `InsufficientFunds`), the transient `LockTimeout`,
    /// or `SystemAccountMissing` if the fee account disappeared after
    /// startup.
    pub fn execute_transfer(
        &self,
        sender: &Account,
        to_account_number: &str,
        amount: Decimal,
        idempotency_id: Option<TransactionId>,
    ) -> Result<TransferResult, TransferError> {
        if amount <= Decimal::ZERO || round_money(amount) != amount {
            return Err(TransferError::invalid_amount(amount));
        }

        let operation_id = idempotency_id.unwrap_or_else(Uuid::new_v4);

        // Fast-path idempotency check before taking any lock.
        if let Some(existing) = self.log.find_by_transaction_id(&operation_id) {
            warn!(%operation_id, "duplicate transfer attempt, returning committed result");
            return self.replay(&existing);
        }

        let receiver = self.accounts.get_by_number(to_account_number)?;
        if receiver.id == sender.id {
            return Err(TransferError::SelfTransfer {
                number: sender.number.clone(),
            });
        }

        let system = self
            .accounts
            .get(self.config.system_account)
            .map_err(|_| TransferError::SystemAccountMissing)?;

        // All three rows lock in one call; the store orders acquisition by
        // ascending id, so crossing transfers cannot deadlock.
        let lease = self
            .accounts
            .lock_and_fetch(&[sender.id, receiver.id, system.id])?;

        // Re-check under lock: a racing retry may have committed between
        // the fast-path check and lock acquisition.
        if let Some(existing) = self.log.find_by_transaction_id(&operation_id) {
            warn!(%operation_id, "duplicate transfer attempt, returning committed result");
            return self.replay(&existing);
        }

        let fee = self.config.fees.calculate(amount)?;
        let total_debited = amount + fee;

        let sender_before = self.locked_balance(&lease, sender.id)?;
        if sender_before < total_debited {
            debug!(
                %operation_id,
                required = %total_debited,
                available = %sender_before,
                "transfer rejected for insufficient funds"
            );
            return Err(TransferError::insufficient_funds(
                total_debited,
                sender_before,
            ));
        }
        let receiver_before = self.locked_balance(&lease, receiver.id)?;
        let system_before = self.locked_balance(&lease, system.id)?;

        let receiver_txn_id = self.fresh_entry_id();
        let fee_txn_id = self.fresh_entry_id();

        let mut applied: Vec<(AccountId, Decimal)> = Vec::with_capacity(3);
        for (account_id, delta) in [
            (sender.id, -total_debited),
            (receiver.id, amount),
            (system.id, fee),
        ] {
            if let Err(fault) = self.accounts.apply_delta(account_id, delta) {
                self.reverse_deltas(&applied);
                return Err(fault);
            }
            applied.push((account_id, delta));
        }

        // Post-delta balances, read while the lease is still held.
        let sender_after = self.accounts.get(sender.id)?.balance;
        let receiver_after = self.accounts.get(receiver.id)?.balance;
        let system_after = self.accounts.get(system.id)?.balance;

        let sender_entry = NewEntry {
            transaction_id: operation_id,
            account_id: sender.id,
            kind: TransactionKind::Debit,
            amount: total_debited,
            description: format!("Transfer to {}", receiver.number),
            metadata: TransferMetadata {
                operation: "transfer".to_string(),
                operation_id,
                receiver_txn_id,
                fee_txn_id,
                role: TransferRole::Sender,
                counterparty_account: Some(receiver.number.clone()),
                sender_account: None,
                receiver_account: None,
                transfer_amount: format_amount(amount),
                fee: Some(format_amount(fee)),
                total_debited: Some(format_amount(total_debited)),
                balance_before: format_amount(sender_before),
                balance_after: format_amount(sender_after),
            }
            .to_value(),
        };

        // The sender entry carries the caller's id; a unique-constraint hit
        // here means a racing retry committed first despite our lock, so
        // back out the deltas and answer from the committed entry.
        match self.log.append(sender_entry) {
            Ok(_) => {}
            Err(TransferError::DuplicateTransactionId { .. }) => {
                self.reverse_deltas(&applied);
                warn!(%operation_id, "duplicate transfer attempt, returning committed result");
                let existing = self
                    .log
                    .find_by_transaction_id(&operation_id)
                    .ok_or(TransferError::InvalidMetadata {
                        transaction_id: operation_id,
                    })?;
                return self.replay(&existing);
            }
            Err(fault) => {
                self.reverse_deltas(&applied);
                return Err(fault);
            }
        }

        self.log.append(NewEntry {
            transaction_id: receiver_txn_id,
            account_id: receiver.id,
            kind: TransactionKind::Credit,
            amount,
            description: format!("Transfer from {}", sender.number),
            metadata: TransferMetadata {
                operation: "transfer".to_string(),
                operation_id,
                receiver_txn_id,
                fee_txn_id,
                role: TransferRole::Receiver,
                counterparty_account: Some(sender.number.clone()),
                sender_account: None,
                receiver_account: None,
                transfer_amount: format_amount(amount),
                fee: None,
                total_debited: None,
                balance_before: format_amount(receiver_before),
                balance_after: format_amount(receiver_after),
            }
            .to_value(),
        })?;

        self.log.append(NewEntry {
            transaction_id: fee_txn_id,
            account_id: system.id,
            kind: TransactionKind::Fee,
            amount: fee,
            description: format!("Transfer fee: {} to {}", sender.number, receiver.number),
            metadata: TransferMetadata {
                operation: "transfer".to_string(),
                operation_id,
                receiver_txn_id,
                fee_txn_id,
                role: TransferRole::Fee,
                counterparty_account: None,
                sender_account: Some(sender.number.clone()),
                receiver_account: Some(receiver.number.clone()),
                transfer_amount: format_amount(amount),
                fee: Some(format_amount(fee)),
                total_debited: None,
                balance_before: format_amount(system_before),
                balance_after: format_amount(system_after),
            }
            .to_value(),
        })?;

        info!(
            %operation_id,
            sender = %sender.number,
            receiver = %receiver.number,
            amount = %format_amount(amount),
            fee = %format_amount(fee),
            "transfer completed"
        );

        Ok(TransferResult {
            operation_id,
            sender_transaction_id: operation_id,
            receiver_transaction_id: receiver_txn_id,
            fee_transaction_id: fee_txn_id,
            sender_account: sender.number.clone(),
            receiver_account: receiver.number.clone(),
            amount: format_amount(amount),
            fee: format_amount(fee),
            total_debited: format_amount(total_debited),
            sender_balance_before: format_amount(sender_before),
            sender_balance_after: format_amount(sender_after),
        })
    }

    /// Execute a transfer, retrying transient faults with backoff
    ///
    /// Only faults classified transient (lock timeouts) are retried;
    /// business failures and fatal faults return immediately. Each retry
    /// reuses the same idempotency id, so a fault that struck after commit
    /// resolves to the committed result on the next attempt.
    pub fn execute_transfer_with_retry(
        &self,
        sender: &Account,
        to_account_number: &str,
        amount: Decimal,
        idempotency_id: Option<TransactionId>,
        max_attempts: u32,
    ) -> Result<TransferResult, TransferError> {
        let operation_id = idempotency_id.unwrap_or_else(Uuid::new_v4);
        let mut attempt = 1;
        loop {
            match self.execute_transfer(sender, to_account_number, amount, Some(operation_id)) {
                Err(fault) if fault.is_transient() && attempt < max_attempts => {
                    warn!(
                        %operation_id,
                        attempt,
                        %fault,
                        "transient fault, retrying transfer"
                    );
                    thread::sleep(Duration::from_millis(25 * u64::from(attempt)));
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Credit an out-of-band bonus to an account
    ///
    /// Follows the same atomicity discipline as a transfer: row lock,
    /// storage-level delta, one ledger entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive or overscaled amounts,
    /// `LockTimeout` if the account's row lock is contended past the
    /// store's timeout, or store faults on the credit itself.
    pub fn grant_bonus(
        &self,
        account: &Account,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction, TransferError> {
        if amount <= Decimal::ZERO || round_money(amount) != amount {
            return Err(TransferError::invalid_amount(amount));
        }
        let _lease = self.accounts.lock_and_fetch(&[account.id])?;
        self.accounts.apply_delta(account.id, amount)?;
        let entry = self.log.append(NewEntry {
            transaction_id: self.fresh_entry_id(),
            account_id: account.id,
            kind: TransactionKind::Bonus,
            amount,
            description: description.to_string(),
            metadata: serde_json::Value::Null,
        })?;
        info!(
            account = %account.number,
            amount = %format_amount(amount),
            description,
            "bonus credited"
        );
        Ok(entry)
    }

    /// Credit the configured welcome bonus to a newly opened account
    pub fn grant_welcome_bonus(&self, account: &Account) -> Result<Transaction, TransferError> {
        self.grant_bonus(account, self.config.welcome_bonus, "Welcome bonus")
    }

    /// List an account's ledger entries, newest first
    pub fn history(&self, account_id: AccountId, filter: &TransactionFilter) -> Vec<Transaction> {
        self.log.list_for_account(account_id, filter)
    }

    /// Reconstruct the committed result from the sender entry's metadata
    ///
    /// The replay needs exactly one indexed read plus this entry; all
    /// cross-references are denormalized onto it.
    fn replay(&self, sender_entry: &Transaction) -> Result<TransferResult, TransferError> {
        let malformed = || TransferError::InvalidMetadata {
            transaction_id: sender_entry.transaction_id,
        };
        let metadata =
            TransferMetadata::from_value(&sender_entry.metadata).ok_or_else(malformed)?;
        let sender = self.accounts.get(sender_entry.account_id)?;

        Ok(TransferResult {
            operation_id: metadata.operation_id,
            sender_transaction_id: sender_entry.transaction_id,
            receiver_transaction_id: metadata.receiver_txn_id,
            fee_transaction_id: metadata.fee_txn_id,
            sender_account: sender.number,
            receiver_account: metadata.counterparty_account.ok_or_else(malformed)?,
            amount: metadata.transfer_amount,
            fee: metadata.fee.ok_or_else(malformed)?,
            total_debited: metadata.total_debited.ok_or_else(malformed)?,
            sender_balance_before: metadata.balance_before,
            sender_balance_after: metadata.balance_after,
        })
    }

    fn locked_balance(
        &self,
        lease: &S::Lease,
        account_id: AccountId,
    ) -> Result<Decimal, TransferError> {
        lease
            .account(account_id)
            .map(|account| account.balance)
            .ok_or(TransferError::UnknownAccount { id: account_id })
    }

    /// Draw an engine-generated entry id not yet present in the log
    ///
    /// Collisions on random UUIDs are vanishingly rare; the pre-check just
    /// converts an append-time constraint violation into a retry here.
    fn fresh_entry_id(&self) -> TransactionId {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = Uuid::new_v4();
            if self.log.find_by_transaction_id(&id).is_none() {
                return id;
            }
        }
        Uuid::new_v4()
    }

    fn reverse_deltas(&self, applied: &[(AccountId, Decimal)]) {
        for (account_id, delta) in applied.iter().rev() {
            if let Err(fault) = self.accounts.apply_delta(*account_id, -*delta) {
                error!(account_id, %fault, "failed to reverse balance delta");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account_store::InMemoryAccountStore;
    use crate::core::transaction_log::InMemoryTransactionLog;

    const SYSTEM_NUMBER: &str = "0000000001";

    struct Harness {
        accounts: Arc<InMemoryAccountStore>,
        log: Arc<InMemoryTransactionLog>,
        engine: TransferEngine<InMemoryAccountStore, InMemoryTransactionLog>,
        alice: Account,
        bob: Account,
    }

    fn harness() -> Harness {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let log = Arc::new(InMemoryTransactionLog::new());

        accounts.open_account(SYSTEM_NUMBER, None).unwrap();
        let alice = accounts
            .open_account("1100000001", Some("alice@example.com"))
            .unwrap();
        let bob = accounts
            .open_account("1100000002", Some("bob@example.com"))
            .unwrap();

        let config = EngineConfig::resolve(accounts.as_ref(), SYSTEM_NUMBER).unwrap();
        let engine =
            TransferEngine::new(Arc::clone(&accounts), Arc::clone(&log), config).unwrap();

        // Seed the sender with the welcome bonus so transfers have funds.
        engine.grant_welcome_bonus(&alice).unwrap();

        Harness {
            accounts,
            log,
            engine,
            alice,
            bob,
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_transfer_moves_amount_fee_and_writes_three_entries() {
        let h = harness();

        let result = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("1000.00"), None)
            .unwrap();

        assert_eq!(result.amount, "1000.00");
        assert_eq!(result.fee, "25.00");
        assert_eq!(result.total_debited, "1025.00");
        assert_eq!(result.sender_balance_before, "10000.00");
        assert_eq!(result.sender_balance_after, "8975.00");

        assert_eq!(
            h.accounts.get(h.alice.id).unwrap().balance,
            dec("8975.00")
        );
        assert_eq!(h.accounts.get(h.bob.id).unwrap().balance, dec("1000.00"));
        let system = h.accounts.get_by_number(SYSTEM_NUMBER).unwrap();
        assert_eq!(system.balance, dec("25.00"));

        // Bonus entry plus the transfer's three.
        assert_eq!(h.log.len(), 4);
    }

    #[test]
    fn test_conservation_of_money() {
        let h = harness();
        let before: Decimal = h
            .accounts
            .all_accounts()
            .iter()
            .map(|account| account.balance)
            .sum();

        h.engine
            .execute_transfer(&h.alice, &h.bob.number, dec("123.45"), None)
            .unwrap();

        let after: Decimal = h
            .accounts
            .all_accounts()
            .iter()
            .map(|account| account.balance)
            .sum();
        assert_eq!(before, after);
    }

    #[test]
    fn test_ledger_entry_shapes() {
        let h = harness();
        let result = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("200.00"), None)
            .unwrap();

        let sender_entry = h
            .log
            .find_by_transaction_id(&result.sender_transaction_id)
            .unwrap();
        assert_eq!(sender_entry.kind, TransactionKind::Debit);
        assert_eq!(sender_entry.amount, dec("205.00"));
        assert_eq!(sender_entry.description, "Transfer to 1100000002");

        let receiver_entry = h
            .log
            .find_by_transaction_id(&result.receiver_transaction_id)
            .unwrap();
        assert_eq!(receiver_entry.kind, TransactionKind::Credit);
        assert_eq!(receiver_entry.amount, dec("200.00"));
        assert_eq!(receiver_entry.description, "Transfer from 1100000001");

        let fee_entry = h
            .log
            .find_by_transaction_id(&result.fee_transaction_id)
            .unwrap();
        assert_eq!(fee_entry.kind, TransactionKind::Fee);
        assert_eq!(fee_entry.amount, dec("5.00"));
        assert_eq!(
            fee_entry.description,
            "Transfer fee: 1100000001 to 1100000002"
        );
    }

    #[test]
    fn test_replay_returns_identical_result_and_moves_nothing() {
        let h = harness();
        let operation_id = Uuid::new_v4();

        let first = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("1000.00"), Some(operation_id))
            .unwrap();
        let replayed = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("1000.00"), Some(operation_id))
            .unwrap();

        assert_eq!(first, replayed);
        assert_eq!(
            h.accounts.get(h.alice.id).unwrap().balance,
            dec("8975.00")
        );
        assert_eq!(h.log.len(), 4);
    }

    #[test]
    fn test_replay_with_different_arguments_returns_original() {
        let h = harness();
        let operation_id = Uuid::new_v4();

        let first = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("1000.00"), Some(operation_id))
            .unwrap();
        let replayed = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("999.00"), Some(operation_id))
            .unwrap();

        assert_eq!(replayed, first);
        assert_eq!(replayed.amount, "1000.00");
    }

    #[test]
    fn test_rejects_non_positive_and_overscaled_amounts() {
        let h = harness();

        for amount in ["0.00", "-10.00", "1.999"] {
            let result = h
                .engine
                .execute_transfer(&h.alice, &h.bob.number, dec(amount), None);
            assert!(
                matches!(result.unwrap_err(), TransferError::InvalidAmount { .. }),
                "amount {amount} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_unknown_recipient() {
        let h = harness();

        let result = h
            .engine
            .execute_transfer(&h.alice, "9999999999", dec("10.00"), None);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::AccountNotFound { .. }
        ));
    }

    #[test]
    fn test_rejects_self_transfer() {
        let h = harness();

        let result = h
            .engine
            .execute_transfer(&h.alice, &h.alice.number, dec("10.00"), None);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::SelfTransfer { .. }
        ));
    }

    #[test]
    fn test_insufficient_funds_accounts_for_fee() {
        let h = harness();

        // Balance is exactly 10000.00; amount alone fits but amount + fee
        // does not.
        let result = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("10000.00"), None);

        let fault = result.unwrap_err();
        assert_eq!(
            fault,
            TransferError::insufficient_funds(dec("10250.00"), dec("10000.00"))
        );
        // Nothing moved, nothing logged beyond the seed bonus.
        assert_eq!(h.accounts.get(h.alice.id).unwrap().balance, dec("10000.00"));
        assert_eq!(h.log.len(), 1);
    }

    #[test]
    fn test_exact_cover_of_amount_plus_fee_succeeds() {
        let h = harness();

        // 9756.10 * 0.025 = 243.9025 -> 243.90; total exactly 10000.00.
        let result = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("9756.10"), None)
            .unwrap();

        assert_eq!(result.total_debited, "10000.00");
        assert_eq!(h.accounts.get(h.alice.id).unwrap().balance, dec("0.00"));
    }

    #[test]
    fn test_one_cent_past_exact_cover_fails_untouched() {
        let h = harness();

        let result = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("9756.11"), None);

        assert_eq!(
            result.unwrap_err(),
            TransferError::insufficient_funds(dec("10000.01"), dec("10000.00"))
        );
        assert_eq!(h.accounts.get(h.alice.id).unwrap().balance, dec("10000.00"));
        assert_eq!(h.accounts.get(h.bob.id).unwrap().balance, dec("0.00"));
    }

    #[test]
    fn test_minimum_fee_applies_to_small_transfers() {
        let h = harness();

        let result = h
            .engine
            .execute_transfer(&h.alice, &h.bob.number, dec("0.01"), None)
            .unwrap();

        assert_eq!(result.fee, "5.00");
        assert_eq!(result.total_debited, "5.01");
    }

    #[test]
    fn test_welcome_bonus_entry() {
        let h = harness();

        let entries = h.engine.history(h.alice.id, &TransactionFilter::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TransactionKind::Bonus);
        assert_eq!(entries[0].amount, WELCOME_BONUS);
        assert_eq!(entries[0].description, "Welcome bonus");
        assert_eq!(entries[0].metadata, serde_json::Value::Null);
    }

    #[test]
    fn test_grant_bonus_rejects_non_positive_amount() {
        let h = harness();

        let result = h.engine.grant_bonus(&h.bob, dec("0.00"), "promo");
        assert!(matches!(
            result.unwrap_err(),
            TransferError::InvalidAmount { .. }
        ));
    }

    #[test]
    fn test_history_newest_first_with_kind_filter() {
        let h = harness();
        h.engine
            .execute_transfer(&h.alice, &h.bob.number, dec("100.00"), None)
            .unwrap();
        h.engine
            .execute_transfer(&h.alice, &h.bob.number, dec("200.00"), None)
            .unwrap();

        let debits = h.engine.history(
            h.alice.id,
            &TransactionFilter {
                kind: Some(TransactionKind::Debit),
                ..Default::default()
            },
        );
        assert_eq!(debits.len(), 2);
        assert_eq!(debits[0].amount, dec("205.00"));
        assert_eq!(debits[1].amount, dec("105.00"));
    }

    #[test]
    fn test_engine_refuses_missing_system_account() {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let log = Arc::new(InMemoryTransactionLog::new());

        let config = EngineConfig {
            system_account: 42,
            fees: FeeSchedule::default(),
            welcome_bonus: WELCOME_BONUS,
        };
        let result = TransferEngine::new(accounts, log, config);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::SystemAccountMissing
        ));
    }

    #[test]
    fn test_config_resolve_missing_system_account() {
        let accounts = InMemoryAccountStore::new();
        let result = EngineConfig::resolve(&accounts, SYSTEM_NUMBER);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::SystemAccountMissing
        ));
    }

    #[test]
    fn test_retry_wrapper_does_not_retry_business_failures() {
        let h = harness();

        let result = h.engine.execute_transfer_with_retry(
            &h.alice,
            &h.bob.number,
            dec("999999.00"),
            None,
            3,
        );
        assert!(matches!(
            result.unwrap_err(),
            TransferError::InsufficientFunds { .. }
        ));
        assert_eq!(h.log.len(), 1);
    }

    #[test]
    fn test_retry_wrapper_resolves_lock_contention() {
        let accounts = Arc::new(InMemoryAccountStore::with_lock_timeout(
            Duration::from_millis(30),
        ));
        let log = Arc::new(InMemoryTransactionLog::new());
        accounts.open_account(SYSTEM_NUMBER, None).unwrap();
        let alice = accounts
            .open_account("1100000001", Some("alice@example.com"))
            .unwrap();
        let bob = accounts
            .open_account("1100000002", Some("bob@example.com"))
            .unwrap();
        let config = EngineConfig::resolve(accounts.as_ref(), SYSTEM_NUMBER).unwrap();
        let engine =
            TransferEngine::new(Arc::clone(&accounts), Arc::clone(&log), config).unwrap();
        engine.grant_welcome_bonus(&alice).unwrap();

        // Hold bob's row just long enough for the first attempt to time out.
        let lease = accounts.lock_and_fetch(&[bob.id]).unwrap();
        let blocker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            drop(lease);
        });

        let result =
            engine.execute_transfer_with_retry(&alice, &bob.number, dec("10.00"), None, 5);
        blocker.join().unwrap();

        assert!(result.is_ok());
        assert_eq!(accounts.get(bob.id).unwrap().balance, dec("10.00"));
    }

    #[test]
    fn test_concurrent_retries_with_same_id_commit_once() {
        let h = harness();
        let engine = Arc::new(h.engine);
        let operation_id = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let alice = h.alice.clone();
                let bob_number = h.bob.number.clone();
                thread::spawn(move || {
                    engine.execute_transfer(&alice, &bob_number, dec("1000.00"), Some(operation_id))
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();

        // Every submission observes the same committed result, and money
        // moved exactly once.
        for result in &results {
            assert_eq!(*result, results[0]);
        }
        assert_eq!(h.accounts.get(h.alice.id).unwrap().balance, dec("8975.00"));
        assert_eq!(h.accounts.get(h.bob.id).unwrap().balance, dec("1000.00"));
        assert_eq!(h.log.len(), 4);
    }

    #[test]
    fn test_crossing_transfers_do_not_deadlock() {
        let h = harness();
        h.engine.grant_welcome_bonus(&h.bob).unwrap();
        let engine = Arc::new(h.engine);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let forward = Arc::clone(&engine);
            let alice = h.alice.clone();
            let bob_number = h.bob.number.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    forward
                        .execute_transfer(&alice, &bob_number, dec("10.00"), None)
                        .unwrap();
                }
            }));

            let backward = Arc::clone(&engine);
            let bob = h.bob.clone();
            let alice_number = h.alice.number.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    backward
                        .execute_transfer(&bob, &alice_number, dec("10.00"), None)
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 80 transfers of 10.00 each direction cancel out except for fees.
        let system = h.accounts.get_by_number(SYSTEM_NUMBER).unwrap();
        assert_eq!(system.balance, dec("400.00"));
        assert_eq!(
            h.accounts.get(h.alice.id).unwrap().balance,
            dec("9800.00")
        );
        assert_eq!(h.accounts.get(h.bob.id).unwrap().balance, dec("9800.00"));
    }
}
