//! Account service
//!
//! Account lifecycle on top of the storage layer: open, look up, rename and
//! close. Balances are never written here; money moves only through the
//! transaction engine.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Money, Policy, PolicyId, Transaction, TransactionStatus, UserAccount};
use crate::storage::{AccountRecord, Storage};

const MAX_NAME_LEN: usize = 100;

pub struct AccountService<'a> {
    storage: &'a Storage,
}

/// An account record with the details shown by `account show`
#[derive(Debug, Clone)]
pub struct AccountSummary {
    pub record: AccountRecord,
    pub policy: Policy,
    pub username: Option<UserAccount>,
    pub transaction_count: usize,
    pub declined_count: usize,
}

impl<'a> AccountService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Open an account with an initial balance under `policy`
    pub fn create(&self, name: &str, initial_balance: Money, policy: &Policy) -> LedgerResult<AccountRecord> {
        let name = validate_name(name)?;
        if initial_balance.is_negative() {
            return Err(LedgerError::Validation(format!(
                "Initial balance cannot be negative: {}",
                initial_balance
            )));
        }

        self.storage.exclusive(|| {
            let policy_id = self.storage.intern_policy(policy)?;
            let record = AccountRecord::new(name, initial_balance, policy_id);

            self.storage.accounts.insert(record.clone())?;
            self.storage.accounts.save()?;

            self.storage.log_create(
                EntityType::Account,
                record.id.to_string(),
                Some(record.name.clone()),
                &record,
            )?;

            tracing::debug!(account = %record.id, name = %record.name, "account created");
            Ok(record)
        })
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<AccountRecord> {
        self.storage
            .accounts
            .get(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))
    }

    /// Resolve a full UUID, short id (`acc-1a2b3c4d`) or registered username
    pub fn resolve(&self, query: &str) -> LedgerResult<AccountRecord> {
        if let Some(record) = self.storage.accounts.find(query)? {
            return Ok(record);
        }
        if let Some(user) = self.storage.users.get(query)? {
            return self.get(user.account_id);
        }
        Err(LedgerError::account_not_found(query))
    }

    pub fn list(&self) -> LedgerResult<Vec<AccountRecord>> {
        self.storage.accounts.get_all()
    }

    pub fn summary(&self, id: AccountId) -> LedgerResult<AccountSummary> {
        let record = self.get(id)?;
        let policy = self
            .storage
            .policies
            .get(&record.policy_id)?
            .ok_or_else(|| LedgerError::policy_not_found(record.policy_id.to_string()))?;
        let history = self.storage.ledger.get_by_account(id)?;

        Ok(AccountSummary {
            username: self.storage.users.get_by_account(id)?,
            transaction_count: history.len(),
            declined_count: history
                .iter()
                .filter(|t| t.status() == TransactionStatus::Declined)
                .count(),
            record,
            policy,
        })
    }

    /// The account's ledger in recording order
    pub fn history(&self, id: AccountId) -> LedgerResult<Vec<Transaction>> {
        self.get(id)?;
        self.storage.ledger.get_by_account(id)
    }

    pub fn rename(&self, id: AccountId, new_name: &str) -> LedgerResult<AccountRecord> {
        let new_name = validate_name(new_name)?;
        let (before, after) = self.storage.exclusive(|| {
            let changed = self
                .storage
                .accounts
                .update_with(id, |r| r.name = new_name.to_string())?;
            self.storage.accounts.save()?;
            Ok(changed)
        })?;

        self.storage.log_update(
            EntityType::Account,
            after.id.to_string(),
            Some(after.name.clone()),
            &before,
            &after,
            Some(format!("name: {} -> {}", before.name, after.name)),
        )?;

        Ok(after)
    }

    /// Point an account at a different policy
    pub fn set_policy(&self, id: AccountId, policy_id: PolicyId) -> LedgerResult<AccountRecord> {
        let (before, after) = self.storage.exclusive(|| {
            if !self.storage.policies.contains(&policy_id)? {
                return Err(LedgerError::policy_not_found(policy_id.to_string()));
            }
            let changed = self
                .storage
                .accounts
                .update_with(id, |r| r.policy_id = policy_id)?;
            self.storage.accounts.save()?;
            Ok(changed)
        })?;

        self.storage.log_update(
            EntityType::Account,
            after.id.to_string(),
            Some(after.name.clone()),
            &before,
            &after,
            Some(format!("policy: {} -> {}", before.policy_id, after.policy_id)),
        )?;

        Ok(after)
    }

    /// Close an account
    ///
    /// Its ledger entries stay in the global ledger; its username mapping is
    /// released.
    pub fn delete(&self, id: AccountId) -> LedgerResult<AccountRecord> {
        self.storage.exclusive(|| self.remove(id))
    }

    fn remove(&self, id: AccountId) -> LedgerResult<AccountRecord> {
        let record = self
            .storage
            .accounts
            .delete(id)?
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        self.storage.accounts.save()?;

        if let Some(user) = self.storage.users.remove_by_account(id)? {
            self.storage.users.save()?;
            self.storage.log_delete(
                EntityType::UserAccount,
                user.username.clone(),
                Some(user.username.clone()),
                &user,
            )?;
        }

        self.storage.log_delete(
            EntityType::Account,
            record.id.to_string(),
            Some(record.name.clone()),
            &record,
        )?;

        Ok(record)
    }
}

fn validate_name(name: &str) -> LedgerResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("Account name cannot be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(LedgerError::Validation(format!(
            "Account name too long (max {} characters)",
            MAX_NAME_LEN
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::Operation;
    use crate::config::LedgerPaths;
    use crate::services::{AccountLocks, TransactionService};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(LedgerPaths::with_base_dir(temp_dir.path())).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_create_account() {
        let (_temp, storage) = setup();
        let service = AccountService::new(&storage);

        let record = service
            .create("  Alice ", Money::from_units(1000), &Policy::default())
            .unwrap();
        assert_eq!(record.name, "Alice");
        assert_eq!(record.balance, Money::from_units(1000));
        assert_eq!(record.opening_balance, record.balance);
        assert_eq!(record.policy_id, Policy::default().id());
        assert_eq!(service.list().unwrap().len(), 1);
    }

    #[test]
    fn test_create_validation() {
        let (_temp, storage) = setup();
        let service = AccountService::new(&storage);

        assert!(service.create("", Money::zero(), &Policy::default()).is_err());
        assert!(service
            .create("Bob", Money::from_units(-1), &Policy::default())
            .unwrap_err()
            .is_validation());
        assert!(service
            .create(&"x".repeat(101), Money::zero(), &Policy::default())
            .is_err());
    }

    #[test]
    fn test_resolve_by_short_id_and_username() {
        let (_temp, storage) = setup();
        let service = AccountService::new(&storage);
        let record = service.create("Alice", Money::zero(), &Policy::default()).unwrap();
        storage
            .users
            .insert(UserAccount::new("alice", record.id))
            .unwrap();

        assert_eq!(service.resolve(&record.id.to_string()).unwrap().id, record.id);
        assert_eq!(service.resolve(&record.id.as_uuid().to_string()).unwrap().id, record.id);
        assert_eq!(service.resolve("ALICE").unwrap().id, record.id);
        assert!(service.resolve("nobody").unwrap_err().is_not_found());
    }

    #[test]
    fn test_rename_is_audited() {
        let (_temp, storage) = setup();
        let service = AccountService::new(&storage);
        let record = service.create("Alice", Money::zero(), &Policy::default()).unwrap();

        let renamed = service.rename(record.id, "Alicia").unwrap();
        assert_eq!(renamed.name, "Alicia");
        assert_eq!(renamed.version, record.version + 1);

        let last = storage.audit().read_recent(1).unwrap().pop().unwrap();
        assert_eq!(last.operation, Operation::Update);
        assert_eq!(last.diff_summary.as_deref(), Some("name: Alice -> Alicia"));
    }

    #[test]
    fn test_delete_keeps_ledger_history() {
        let (_temp, storage) = setup();
        let service = AccountService::new(&storage);
        let record = service.create("Alice", Money::from_units(10), &Policy::default()).unwrap();
        storage
            .users
            .insert(UserAccount::new("alice", record.id))
            .unwrap();
        storage.users.save().unwrap();

        let locks = AccountLocks::new();
        TransactionService::new(&storage, &locks)
            .deposit(record.id, Money::from_units(5))
            .unwrap();

        service.delete(record.id).unwrap();
        assert!(service.get(record.id).unwrap_err().is_not_found());
        assert!(storage.users.get("alice").unwrap().is_none());
        assert_eq!(storage.ledger.get_by_account(record.id).unwrap().len(), 1);
    }

    #[test]
    fn test_summary_counts_declines() {
        let (_temp, storage) = setup();
        let service = AccountService::new(&storage);
        let record = service.create("Alice", Money::zero(), &Policy::default()).unwrap();

        let locks = AccountLocks::new();
        let engine = TransactionService::new(&storage, &locks);
        engine.deposit(record.id, Money::from_units(10)).unwrap();
        engine.deposit(record.id, Money::from_units(5000)).unwrap();

        let summary = service.summary(record.id).unwrap();
        assert_eq!(summary.transaction_count, 2);
        assert_eq!(summary.declined_count, 1);
        assert_eq!(summary.record.balance, Money::from_units(10));
        assert!(summary.username.is_none());
    }
}
