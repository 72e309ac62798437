//! Persistence gateway contract
//!
//! The transaction engine talks to storage only through this trait. An
//! implementation must make [`PersistenceGateway::commit`] atomic: either
//! every balance and every ledger entry is written or none is, and it must
//! refuse the whole commit if any account's version moved since it was
//! loaded.

use crate::error::LedgerResult;
use crate::models::{AccountId, Money, Policy, PolicyId, Transaction};

use super::accounts::AccountRecord;

/// A balance write guarded by the version it was computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub account_id: AccountId,
    pub expected_version: u64,
    pub balance: Money,
}

pub trait PersistenceGateway {
    /// Current record for an account, or `None` if it doesn't exist
    fn load_account(&self, id: AccountId) -> LedgerResult<Option<AccountRecord>>;

    fn load_policy(&self, id: &PolicyId) -> LedgerResult<Option<Policy>>;

    /// The account's ledger entries in recording order
    fn load_ledger(&self, id: AccountId) -> LedgerResult<Vec<Transaction>>;

    /// Compare-and-set a single balance; returns the new version
    fn save_balance(&self, id: AccountId, expected_version: u64, balance: Money) -> LedgerResult<u64>;

    /// Record a transaction without touching any balance
    fn append_ledger_entry(&self, tx: &Transaction) -> LedgerResult<()>;

    /// Atomically write several balances and their ledger entries
    ///
    /// Fails with [`LedgerError::Conflict`](crate::error::LedgerError::Conflict)
    /// and writes nothing if any expected version is stale.
    fn commit(&self, changes: &[BalanceChange], entries: &[Transaction]) -> LedgerResult<()>;

    /// Run `f` with every other writer of the same state held off
    ///
    /// Loads made inside `f` see the latest persisted state. The default
    /// runs `f` directly, which only suits a gateway with a single writer.
    fn exclusive<T, F>(&self, f: F) -> LedgerResult<T>
    where
        Self: Sized,
        F: FnOnce() -> LedgerResult<T>,
    {
        f()
    }
}
