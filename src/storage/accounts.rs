//! Account repository for JSON storage
//!
//! Manages loading and saving account records to accounts.json. Every write
//! to a record bumps its version; balance writes are compare-and-set on that
//! version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Money, PolicyId};

use super::file_io::{read_json, write_json_atomic};
use super::gateway::BalanceChange;
use super::lock_error;

/// Persisted form of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
    /// Balance the account was created with, before any ledger entry
    pub opening_balance: Money,
    /// Cached current balance; the ledger is authoritative
    pub balance: Money,
    pub policy_id: PolicyId,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn new(name: impl Into<String>, opening_balance: Money, policy_id: PolicyId) -> Self {
        Self::with_id(AccountId::new(), name, opening_balance, policy_id)
    }

    pub fn with_id(
        id: AccountId,
        name: impl Into<String>,
        opening_balance: Money,
        policy_id: PolicyId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            opening_balance,
            balance: opening_balance,
            policy_id,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AccountData {
    accounts: Vec<AccountRecord>,
}

/// Repository for account persistence
pub struct AccountRepository {
    path: PathBuf,
    data: RwLock<HashMap<AccountId, AccountRecord>>,
}

impl AccountRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> LedgerResult<()> {
        let file_data: AccountData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(lock_error)?;
        data.clear();
        for record in file_data.accounts {
            data.insert(record.id, record);
        }

        Ok(())
    }

    pub fn save(&self) -> LedgerResult<()> {
        let data = self.data.read().map_err(lock_error)?;

        let mut accounts: Vec<_> = data.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        write_json_atomic(&self.path, &AccountData { accounts })
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Option<AccountRecord>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(&id).cloned())
    }

    /// All accounts, oldest first
    pub fn get_all(&self) -> LedgerResult<Vec<AccountRecord>> {
        let data = self.data.read().map_err(lock_error)?;

        let mut accounts: Vec<_> = data.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(accounts)
    }

    /// Find an account by full UUID or short id
    ///
    /// A short id that matches more than one account is a validation error.
    pub fn find(&self, query: &str) -> LedgerResult<Option<AccountRecord>> {
        let data = self.data.read().map_err(lock_error)?;

        let mut hits = data.values().filter(|r| r.id.matches(query));
        let first = hits.next().cloned();
        if hits.next().is_some() {
            return Err(LedgerError::Validation(format!(
                "Account id '{}' is ambiguous; use more characters",
                query
            )));
        }
        Ok(first)
    }

    pub fn insert(&self, record: AccountRecord) -> LedgerResult<()> {
        let mut data = self.data.write().map_err(lock_error)?;

        if data.contains_key(&record.id) {
            return Err(LedgerError::Duplicate {
                entity_type: "Account",
                identifier: record.id.to_string(),
            });
        }
        data.insert(record.id, record);
        Ok(())
    }

    /// Modify a record in place, bumping its version
    ///
    /// Returns the record before and after the change.
    pub fn update_with<F>(&self, id: AccountId, f: F) -> LedgerResult<(AccountRecord, AccountRecord)>
    where
        F: FnOnce(&mut AccountRecord),
    {
        let mut data = self.data.write().map_err(lock_error)?;

        let record = data
            .get_mut(&id)
            .ok_or_else(|| LedgerError::account_not_found(id.to_string()))?;
        let before = record.clone();
        f(record);
        record.touch();
        Ok((before, record.clone()))
    }

    /// Verify every change's expected version without writing anything
    pub fn check_versions(&self, changes: &[BalanceChange]) -> LedgerResult<()> {
        let data = self.data.read().map_err(lock_error)?;
        check_versions(&data, changes)
    }

    /// Compare-and-set the balances of several accounts at once
    ///
    /// Either every expected version matches and all balances are written,
    /// or nothing is. Returns the records as they were before the write.
    pub fn apply_balances(&self, changes: &[BalanceChange]) -> LedgerResult<Vec<AccountRecord>> {
        let mut data = self.data.write().map_err(lock_error)?;
        check_versions(&data, changes)?;

        let mut previous = Vec::with_capacity(changes.len());
        for change in changes {
            if let Some(record) = data.get_mut(&change.account_id) {
                previous.push(record.clone());
                record.balance = change.balance;
                record.touch();
            }
        }
        Ok(previous)
    }

    /// Put records back exactly as given (undo of [`apply_balances`](Self::apply_balances))
    pub fn restore_records(&self, records: Vec<AccountRecord>) -> LedgerResult<()> {
        let mut data = self.data.write().map_err(lock_error)?;
        for record in records {
            data.insert(record.id, record);
        }
        Ok(())
    }

    pub fn delete(&self, id: AccountId) -> LedgerResult<Option<AccountRecord>> {
        let mut data = self.data.write().map_err(lock_error)?;
        Ok(data.remove(&id))
    }

    pub fn count(&self) -> LedgerResult<usize> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.len())
    }
}

fn check_versions(
    data: &HashMap<AccountId, AccountRecord>,
    changes: &[BalanceChange],
) -> LedgerResult<()> {
    for change in changes {
        let record = data
            .get(&change.account_id)
            .ok_or_else(|| LedgerError::account_not_found(change.account_id.to_string()))?;

        if record.version != change.expected_version {
            return Err(LedgerError::Conflict {
                account: change.account_id.to_string(),
                expected: change.expected_version,
                found: record.version,
            });
        }
    }
    Ok(())
}
