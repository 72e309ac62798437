//! Username ↔ account mapping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(username: impl Into<String>, account_id: AccountId) -> Self {
        Self {
            username: username.into().trim().to_string(),
            account_id,
            created_at: Utc::now(),
        }
    }

    /// Usernames compare case-insensitively
    pub fn key(&self) -> String {
        normalize_username(&self.username)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("Username cannot be empty".into());
        }
        if self.username.len() > 64 {
            return Err(format!(
                "Username too long ({} chars, max 64)",
                self.username.len()
            ));
        }
        if self.username.chars().any(char::is_whitespace) {
            return Err("Username cannot contain whitespace".into());
        }
        Ok(())
    }
}

pub fn normalize_username(name: &str) -> String {
    name.trim().to_lowercase()
}
