//! Transaction engine
//!
//! Runs one money movement end to end: take the mutation rights of the
//! accounts involved, load them through the gateway, let the [`Account`]
//! state machine decide, and commit the outcome. A commit refused because
//! another writer got there first is retried from a fresh load.
//!
//! Each attempt runs inside [`PersistenceGateway::exclusive`], so with
//! [`Storage`](crate::storage::Storage) the load, the decision and the
//! commit all happen while other processes are held off.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountId, Ledger, Money, Transaction, TransactionStatus};
use crate::storage::{BalanceChange, PersistenceGateway};

use super::locks::AccountLocks;

/// Default number of re-runs after a version conflict
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// An account rebuilt from persisted state with the version it was read at
#[derive(Debug, Clone)]
pub struct LoadedAccount {
    pub account: Account,
    pub version: u64,
}

impl LoadedAccount {
    fn change(&self) -> BalanceChange {
        BalanceChange {
            account_id: self.account.id(),
            expected_version: self.version,
            balance: self.account.balance(),
        }
    }
}

pub struct TransactionService<'a, G: PersistenceGateway> {
    gateway: &'a G,
    locks: &'a AccountLocks,
    conflict_retries: u32,
}

impl<'a, G: PersistenceGateway> TransactionService<'a, G> {
    pub fn new(gateway: &'a G, locks: &'a AccountLocks) -> Self {
        Self {
            gateway,
            locks,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    pub fn with_retries(mut self, conflict_retries: u32) -> Self {
        self.conflict_retries = conflict_retries;
        self
    }

    /// Rebuild an account from the gateway
    ///
    /// Fails with [`LedgerError::CorruptState`] if the policy reference
    /// dangles or the stored balance cannot be explained by the ledger.
    pub fn load_account(&self, id: AccountId) -> LedgerResult<LoadedAccount> {
        let record = self
            .gateway
            .load_account(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;

        let policy = self.gateway.load_policy(&record.policy_id)?.ok_or_else(|| {
            LedgerError::CorruptState(format!(
                "Account {} references missing policy {}",
                record.id, record.policy_id
            ))
        })?;

        let ledger = Ledger::from_transactions(self.gateway.load_ledger(id)?);
        let account = Account::restore(record.id, record.name, record.balance, policy, ledger);

        if account.opening_balance() != record.opening_balance {
            return Err(LedgerError::CorruptState(format!(
                "Account {} balance {} does not match its ledger (opening {}, net {})",
                record.id,
                record.balance,
                record.opening_balance,
                account.ledger().net_effect()
            )));
        }

        Ok(LoadedAccount {
            account,
            version: record.version,
        })
    }

    /// Deposit into one account
    ///
    /// A policy refusal is not an error: the DECLINED transaction is
    /// recorded and returned.
    pub fn deposit(&self, id: AccountId, amount: Money) -> LedgerResult<Transaction> {
        self.single(id, |account| account.deposit(amount))
    }

    /// Withdraw from one account
    pub fn withdraw(&self, id: AccountId, amount: Money) -> LedgerResult<Transaction> {
        self.single(id, |account| account.withdraw(amount))
    }

    /// Pay from `payer` to `payee`; returns the (payer, payee) legs
    pub fn pay(
        &self,
        payer: AccountId,
        payee: AccountId,
        amount: Money,
    ) -> LedgerResult<(Transaction, Transaction)> {
        if payer == payee {
            return Err(LedgerError::Validation(
                "Payer and payee must be different accounts".into(),
            ));
        }

        let _rights = self.locks.acquire(&[payer, payee])?;

        self.retrying("pay", || self.gateway.exclusive(|| {
            let mut from = self.load_account(payer)?;
            let mut to = self.load_account(payee)?;
            let balances_before = (from.account.balance(), to.account.balance());

            let (out_leg, in_leg) = from.account.payment(&mut to.account, amount);
            log_outcome(&out_leg);

            let entries = [out_leg.clone(), in_leg.clone()];
            match self.gateway.commit(&[from.change(), to.change()], &entries) {
                Ok(()) => Ok((out_leg, in_leg)),
                // A vanished account has no ledger left to explain a FAILURE
                Err(e) if e.is_retryable() || e.is_not_found() => Err(e),
                Err(e) => {
                    self.record_failure(&out_leg, balances_before.0, &e);
                    self.record_failure(&in_leg, balances_before.1, &e);
                    Err(e)
                }
            }
        }))
    }

    fn single<F>(&self, id: AccountId, operation: F) -> LedgerResult<Transaction>
    where
        F: Fn(&mut Account) -> Transaction,
    {
        let _rights = self.locks.acquire(&[id])?;

        self.retrying("single", || self.gateway.exclusive(|| {
            let mut loaded = self.load_account(id)?;
            let balance_before = loaded.account.balance();

            let tx = operation(&mut loaded.account);
            log_outcome(&tx);

            match self.gateway.commit(&[loaded.change()], std::slice::from_ref(&tx)) {
                Ok(()) => Ok(tx),
                // A vanished account has no ledger left to explain a FAILURE
                Err(e) if e.is_retryable() || e.is_not_found() => Err(e),
                Err(e) => {
                    self.record_failure(&tx, balance_before, &e);
                    Err(e)
                }
            }
        }))
    }

    /// Run `attempt`, re-running it on version conflicts up to the retry budget
    fn retrying<T, F>(&self, operation: &str, mut attempt: F) -> LedgerResult<T>
    where
        F: FnMut() -> LedgerResult<T>,
    {
        let mut retries = 0;
        loop {
            match attempt() {
                Err(e) if e.is_retryable() && retries < self.conflict_retries => {
                    retries += 1;
                    debug!(operation, retries, error = %e, "commit conflict, retrying");
                }
                Err(e) if e.is_retryable() => {
                    warn!(operation, retries, error = %e, "giving up after repeated conflicts");
                    return Err(e);
                }
                other => return other,
            }
        }
    }

    /// Best-effort FAILURE entry for an outcome that could not be committed
    fn record_failure(&self, attempted: &Transaction, balance: Money, cause: &LedgerError) {
        let mut failed = Transaction::new(
            Some(attempted.id()),
            attempted.account_id(),
            attempted.amount(),
            attempted.tx_type(),
            attempted.flow(),
            balance,
            Utc::now(),
        );
        if let Some(counterparty) = attempted.counterparty() {
            failed = failed.with_counterparty(counterparty);
        }
        let failed = failed.with_outcome(TransactionStatus::Failure);

        error!(
            account = %failed.account_id(),
            transaction = %failed.id(),
            error = %cause,
            "commit failed; recording FAILURE"
        );
        if let Err(e) = self.gateway.append_ledger_entry(&failed) {
            error!(transaction = %failed.id(), error = %e, "could not record FAILURE entry");
        }
    }
}

fn log_outcome(tx: &Transaction) {
    match tx.status() {
        TransactionStatus::Declined => info!(
            account = %tx.account_id(),
            kind = %tx.tx_type(),
            amount = %tx.amount(),
            balance = %tx.current_balance(),
            "declined by policy"
        ),
        _ => debug!(
            account = %tx.account_id(),
            kind = %tx.tx_type(),
            amount = %tx.amount(),
            status = %tx.status(),
            "decided"
        ),
    }
}
