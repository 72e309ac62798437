//! Username mapping repository for JSON storage
//!
//! Usernames are unique ignoring case; each account carries at most one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{normalize_username, AccountId, UserAccount};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserData {
    users: Vec<UserAccount>,
}

pub struct UserRepository {
    path: PathBuf,
    /// Keyed by normalized username
    data: RwLock<HashMap<String, UserAccount>>,
}

impl UserRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> LedgerResult<()> {
        let file_data: UserData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(lock_error)?;
        data.clear();
        data.extend(file_data.users.into_iter().map(|u| (u.key(), u)));
        Ok(())
    }

    pub fn save(&self) -> LedgerResult<()> {
        let users = self.get_all()?;
        write_json_atomic(&self.path, &UserData { users })
    }

    pub fn get(&self, username: &str) -> LedgerResult<Option<UserAccount>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(&normalize_username(username)).cloned())
    }

    pub fn get_by_account(&self, account_id: AccountId) -> LedgerResult<Option<UserAccount>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.values().find(|u| u.account_id == account_id).cloned())
    }

    /// All mappings sorted by username
    pub fn get_all(&self) -> LedgerResult<Vec<UserAccount>> {
        let data = self.data.read().map_err(lock_error)?;

        let mut users: Vec<_> = data.values().cloned().collect();
        users.sort_by_key(|u| u.key());
        Ok(users)
    }

    pub fn insert(&self, user: UserAccount) -> LedgerResult<()> {
        let mut data = self.data.write().map_err(lock_error)?;

        let key = user.key();
        if data.contains_key(&key) {
            return Err(LedgerError::Duplicate {
                entity_type: "User",
                identifier: user.username,
            });
        }
        if let Some(existing) = data.values().find(|u| u.account_id == user.account_id) {
            return Err(LedgerError::Duplicate {
                entity_type: "Username for account",
                identifier: format!("{} ({})", user.account_id, existing.username),
            });
        }

        data.insert(key, user);
        Ok(())
    }

    pub fn remove_by_account(&self, account_id: AccountId) -> LedgerResult<Option<UserAccount>> {
        let mut data = self.data.write().map_err(lock_error)?;

        let key = data
            .iter()
            .find(|(_, u)| u.account_id == account_id)
            .map(|(k, _)| k.clone());
        Ok(key.and_then(|k| data.remove(&k)))
    }

    /// Case-insensitive substring search on usernames, sorted, at most `limit`
    pub fn search(&self, query: &str, limit: usize) -> LedgerResult<Vec<UserAccount>> {
        let needle = normalize_username(query);
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|u| u.key().contains(&needle))
            .take(limit)
            .collect())
    }
}
