//! Storage layer for policy-ledger
//!
//! JSON file repositories with atomic writes, plus [`Storage`], which
//! coordinates them, implements the [`PersistenceGateway`] contract and
//! writes the audit log.
//!
//! ## Commit order
//!
//! A commit appends to the ledger first and rewrites the balance cache
//! second. If the process dies in between, the ledger holds entries the
//! balances don't reflect yet; [`Storage::load_all`] detects that and
//! rebuilds the affected balances from the ledger.
//!
//! ## Several writers
//!
//! Every write runs inside [`Storage::exclusive`], which takes the data
//! directory's [`DirLock`] and reloads all repositories from disk first.
//! Version checks in [`PersistenceGateway::commit`] therefore compare
//! against what is on disk, not against this process's last snapshot.

pub mod accounts;
pub mod file_io;
pub mod gateway;
pub mod init;
pub mod ledger;
pub mod lock;
pub mod policies;
pub mod policy_requests;
pub mod users;

pub use accounts::{AccountRecord, AccountRepository};
pub use file_io::{read_json, write_json_atomic};
pub use gateway::{BalanceChange, PersistenceGateway};
pub use init::initialize_storage;
pub use ledger::LedgerRepository;
pub use lock::{DirLock, DirLockGuard};
pub use policies::PolicyRepository;
pub use policy_requests::PolicyRequestRepository;
pub use users::UserRepository;

use serde::Serialize;
use std::fmt::Display;

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::paths::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Money, Policy, PolicyId, Transaction};

pub(crate) fn lock_error<E: Display>(e: E) -> LedgerError {
    LedgerError::Storage(format!("Failed to acquire lock: {}", e))
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    pub accounts: AccountRepository,
    pub policies: PolicyRepository,
    pub ledger: LedgerRepository,
    pub requests: PolicyRequestRepository,
    pub users: UserRepository,
    audit: AuditLogger,
    /// Serializes writers, in this process and others
    write_lock: DirLock,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Create a storage instance over `paths` without loading anything
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            accounts: AccountRepository::new(paths.accounts_file()),
            policies: PolicyRepository::new(paths.policies_file()),
            ledger: LedgerRepository::new(paths.ledger_file()),
            requests: PolicyRequestRepository::new(paths.policy_requests_file()),
            users: UserRepository::new(paths.users_file()),
            audit: AuditLogger::new(paths.audit_log()),
            write_lock: DirLock::new(paths.lock_file()),
            paths,
        })
    }

    /// Create and fully load a storage instance
    pub fn open(paths: LedgerPaths) -> LedgerResult<Self> {
        let storage = Self::new(paths)?;
        storage.exclusive(|| Ok(()))?;
        Ok(storage)
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Run `f` while holding the data directory's write lock
    ///
    /// The outermost call reloads every repository from disk before `f`
    /// runs, so `f` decides against the latest state any process wrote.
    /// Nested calls on the same thread reuse the lock without reloading.
    pub fn exclusive<T>(&self, f: impl FnOnce() -> LedgerResult<T>) -> LedgerResult<T> {
        let guard = self.write_lock.acquire()?;
        if guard.is_outermost() {
            self.load_all()?;
        }
        f()
    }

    /// Load all data from disk, check references and repair stale balances
    pub fn load_all(&self) -> LedgerResult<()> {
        self.accounts.load()?;
        self.policies.load()?;
        self.ledger.load()?;
        self.requests.load()?;
        self.users.load()?;

        self.check_policy_references()?;
        let repaired = self.repair_balances()?;
        if repaired > 0 {
            self.accounts.save()?;
        }
        Ok(())
    }

    /// Write every repository under the write lock, without reloading
    pub fn save_all(&self) -> LedgerResult<()> {
        let _guard = self.write_lock.acquire()?;
        self.policies.save()?;
        self.ledger.save()?;
        self.accounts.save()?;
        self.requests.save()?;
        self.users.save()?;
        Ok(())
    }

    fn check_policy_references(&self) -> LedgerResult<()> {
        for record in self.accounts.get_all()? {
            if !self.policies.contains(&record.policy_id)? {
                return Err(LedgerError::CorruptState(format!(
                    "Account {} references missing policy {}",
                    record.id, record.policy_id
                )));
            }
        }
        Ok(())
    }

    /// Rebuild every cached balance that disagrees with the ledger
    ///
    /// Returns the number of accounts repaired.
    pub fn repair_balances(&self) -> LedgerResult<usize> {
        let mut repaired = 0;
        for record in self.accounts.get_all()? {
            let expected = record.opening_balance + self.ledger.net_effect(record.id)?;
            if expected == record.balance {
                continue;
            }

            tracing::warn!(
                account = %record.id,
                cached = %record.balance,
                rebuilt = %expected,
                "balance cache disagreed with ledger; repaired"
            );
            self.accounts.update_with(record.id, |r| r.balance = expected)?;
            repaired += 1;
        }
        Ok(repaired)
    }

    /// Store `policy` (deduplicated) and persist policies if it was new
    pub fn intern_policy(&self, policy: &Policy) -> LedgerResult<PolicyId> {
        self.exclusive(|| {
            let (id, added) = self.policies.intern(policy)?;
            if added {
                self.policies.save()?;
                self.log_create(EntityType::Policy, id.to_string(), None, policy)?;
            }
            Ok(id)
        })
    }

    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> LedgerResult<()> {
        self.audit
            .log(&AuditEntry::create(entity_type, entity_id, entity_name, entity))
    }

    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> LedgerResult<()> {
        self.audit.log(&AuditEntry::update(
            entity_type,
            entity_id,
            entity_name,
            before,
            after,
            diff_summary,
        ))
    }

    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> LedgerResult<()> {
        self.audit
            .log(&AuditEntry::delete(entity_type, entity_id, entity_name, entity))
    }

    /// Whether `ledger init` has been run
    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }
}

impl PersistenceGateway for Storage {
    fn load_account(&self, id: AccountId) -> LedgerResult<Option<AccountRecord>> {
        self.accounts.get(id)
    }

    fn load_policy(&self, id: &PolicyId) -> LedgerResult<Option<Policy>> {
        self.policies.get(id)
    }

    fn load_ledger(&self, id: AccountId) -> LedgerResult<Vec<Transaction>> {
        self.ledger.get_by_account(id)
    }

    fn save_balance(&self, id: AccountId, expected_version: u64, balance: Money) -> LedgerResult<u64> {
        self.exclusive(|| {
            let change = BalanceChange {
                account_id: id,
                expected_version,
                balance,
            };
            let previous = self.accounts.apply_balances(&[change])?;
            if let Err(e) = self.accounts.save() {
                self.accounts.restore_records(previous)?;
                return Err(e);
            }
            Ok(expected_version + 1)
        })
    }

    fn append_ledger_entry(&self, tx: &Transaction) -> LedgerResult<()> {
        self.exclusive(|| self.ledger.append(std::slice::from_ref(tx)))
    }

    fn commit(&self, changes: &[BalanceChange], entries: &[Transaction]) -> LedgerResult<()> {
        self.exclusive(|| {
            self.accounts.check_versions(changes)?;
            self.ledger.append(entries)?;
            self.accounts.apply_balances(changes)?;

            // The ledger is already durable; a stale cache is rebuilt on next load
            if let Err(e) = self.accounts.save() {
                tracing::error!(error = %e, "failed to write balances after ledger commit");
            }
            Ok(())
        })
    }

    fn exclusive<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce() -> LedgerResult<T>,
    {
        Storage::exclusive(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Account;
    use tempfile::TempDir;

    fn storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(LedgerPaths::with_base_dir(temp_dir.path())).unwrap();
        (temp_dir, storage)
    }

    fn seed(storage: &Storage, name: &str, balance: i64) -> AccountRecord {
        let policy_id = storage.intern_policy(&Policy::default()).unwrap();
        let record = AccountRecord::new(name, Money::from_units(balance), policy_id);
        storage.accounts.insert(record.clone()).unwrap();
        storage.accounts.save().unwrap();
        record
    }

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = storage();
        assert!(temp_dir.path().join("data").exists());
        assert!(!storage.is_initialized());
    }

    #[test]
    fn test_commit_writes_balance_and_ledger() {
        let (_temp, storage) = storage();
        let record = seed(&storage, "Alice", 100);

        let mut account = Account::restore(
            record.id,
            &record.name,
            record.balance,
            Policy::default(),
            Default::default(),
        );
        let tx = account.deposit(Money::from_units(40));

        storage
            .commit(
                &[BalanceChange {
                    account_id: record.id,
                    expected_version: record.version,
                    balance: account.balance(),
                }],
                &[tx.clone()],
            )
            .unwrap();

        let loaded = storage.load_account(record.id).unwrap().unwrap();
        assert_eq!(loaded.balance, Money::from_units(140));
        assert_eq!(loaded.version, record.version + 1);
        assert_eq!(storage.load_ledger(record.id).unwrap(), vec![tx]);
    }

    #[test]
    fn test_stale_commit_writes_nothing() {
        let (_temp, storage) = storage();
        let record = seed(&storage, "Alice", 100);

        storage
            .save_balance(record.id, record.version, Money::from_units(90))
            .unwrap();

        let mut account = Account::new("shadow", Money::from_units(100));
        let tx = account.withdraw(Money::from_units(10));
        let err = storage
            .commit(
                &[BalanceChange {
                    account_id: record.id,
                    expected_version: record.version,
                    balance: Money::from_units(90),
                }],
                &[tx],
            )
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(storage.ledger.is_empty().unwrap());
    }

    #[test]
    fn test_load_repairs_balance_from_ledger() {
        let (temp, storage) = storage();
        let record = seed(&storage, "Alice", 100);

        // Simulate a crash after the ledger write but before the balance write
        let mut account = Account::restore(
            record.id,
            "Alice",
            record.balance,
            Policy::default(),
            Default::default(),
        );
        let tx = account.deposit(Money::from_units(25));
        storage.append_ledger_entry(&tx).unwrap();

        let reopened = Storage::open(LedgerPaths::with_base_dir(temp.path())).unwrap();
        let repaired = reopened.load_account(record.id).unwrap().unwrap();
        assert_eq!(repaired.balance, Money::from_units(125));
        assert_eq!(repaired.version, record.version + 1);
    }

    #[test]
    fn test_second_instance_commits_against_disk() {
        let (temp, first) = storage();
        let record = seed(&first, "Alice", 100);
        let second = Storage::open(LedgerPaths::with_base_dir(temp.path())).unwrap();

        let mut account = Account::restore(
            record.id,
            "Alice",
            record.balance,
            Policy::default(),
            Default::default(),
        );
        let deposit = account.deposit(Money::from_units(10));
        first
            .commit(
                &[BalanceChange {
                    account_id: record.id,
                    expected_version: record.version,
                    balance: account.balance(),
                }],
                &[deposit.clone()],
            )
            .unwrap();

        // `second` still holds the snapshot taken before the deposit
        let stale = second.load_account(record.id).unwrap().unwrap();
        assert_eq!(stale.version, record.version);

        let mut shadow = Account::new("shadow", Money::from_units(100));
        let err = second
            .commit(
                &[BalanceChange {
                    account_id: record.id,
                    expected_version: stale.version,
                    balance: Money::from_units(90),
                }],
                &[shadow.withdraw(Money::from_units(10))],
            )
            .unwrap_err();
        assert!(err.is_retryable());

        // The failed commit refreshed `second` from disk
        let fresh = second.load_account(record.id).unwrap().unwrap();
        assert_eq!(fresh.balance, Money::from_units(110));
        assert_eq!(second.load_ledger(record.id).unwrap(), vec![deposit]);
    }

    #[test]
    fn test_writers_keep_each_others_ledger_entries() {
        let (temp, first) = storage();
        let alice = seed(&first, "Alice", 100);
        let bob = seed(&first, "Bob", 100);
        let second = Storage::open(LedgerPaths::with_base_dir(temp.path())).unwrap();

        for (storage, record) in [(&first, &alice), (&second, &bob)] {
            let mut account = Account::restore(
                record.id,
                &record.name,
                record.balance,
                Policy::default(),
                Default::default(),
            );
            let tx = account.deposit(Money::from_units(5));
            storage
                .commit(
                    &[BalanceChange {
                        account_id: record.id,
                        expected_version: record.version,
                        balance: account.balance(),
                    }],
                    &[tx],
                )
                .unwrap();
        }

        let reopened = Storage::open(LedgerPaths::with_base_dir(temp.path())).unwrap();
        assert_eq!(reopened.ledger.get_all().unwrap().len(), 2);
        for record in [&alice, &bob] {
            let loaded = reopened.load_account(record.id).unwrap().unwrap();
            assert_eq!(loaded.balance, Money::from_units(105));
        }
    }

    #[test]
    fn test_dangling_policy_is_corrupt_state() {
        let (temp, storage) = storage();
        let bogus = PolicyId::from_fields(1, 2, 3, false, 4);
        let record = AccountRecord::new("Alice", Money::zero(), bogus);
        storage.accounts.insert(record).unwrap();
        storage.accounts.save().unwrap();

        let err = Storage::open(LedgerPaths::with_base_dir(temp.path())).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptState(_)));
    }

    #[test]
    fn test_intern_policy_logs_once() {
        let (_temp, storage) = storage();
        storage.intern_policy(&Policy::default()).unwrap();
        storage.intern_policy(&Policy::default()).unwrap();

        let entries = storage.audit().read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, EntityType::Policy);
    }
}
