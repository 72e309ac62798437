//! Username service
//!
//! Registers human-friendly names for accounts and finds them again.

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, UserAccount};
use crate::storage::Storage;

use super::account::AccountService;

/// Most results `search` returns
pub const SEARCH_LIMIT: usize = 10;

pub struct UserService<'a> {
    storage: &'a Storage,
}

impl<'a> UserService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn register(&self, username: &str, account_id: AccountId) -> LedgerResult<UserAccount> {
        self.storage.exclusive(|| {
            AccountService::new(self.storage).get(account_id)?;

            let user = UserAccount::new(username, account_id);
            user.validate().map_err(LedgerError::Validation)?;

            self.storage.users.insert(user.clone())?;
            self.storage.users.save()?;

            self.storage.log_create(
                EntityType::UserAccount,
                user.username.clone(),
                Some(account_id.to_string()),
                &user,
            )?;

            Ok(user)
        })
    }

    /// Fail unless `username` is well-formed and not yet registered
    pub fn check_available(&self, username: &str) -> LedgerResult<()> {
        let candidate = UserAccount::new(username, AccountId::new());
        candidate.validate().map_err(LedgerError::Validation)?;

        if self.storage.users.get(&candidate.username)?.is_some() {
            return Err(LedgerError::Duplicate {
                entity_type: "User",
                identifier: candidate.username,
            });
        }
        Ok(())
    }

    pub fn lookup(&self, username: &str) -> LedgerResult<UserAccount> {
        self.storage
            .users
            .get(username)?
            .ok_or_else(|| LedgerError::user_not_found(username))
    }

    pub fn username_for(&self, account_id: AccountId) -> LedgerResult<Option<UserAccount>> {
        self.storage.users.get_by_account(account_id)
    }

    /// Case-insensitive partial match, at most [`SEARCH_LIMIT`] results
    pub fn search(&self, query: &str) -> LedgerResult<Vec<UserAccount>> {
        self.storage.users.search(query, SEARCH_LIMIT)
    }
}
