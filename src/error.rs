//! Custom error types for policy-ledger
//!
//! Policy violations are deliberately absent here: a withdrawal over the
//! limit is a DECLINED transaction, not an error.

use thiserror::Error;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for input and data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Another writer changed the account since it was loaded
    #[error("Concurrent modification of account {account}: expected version {expected}, found {found}")]
    Conflict {
        account: String,
        expected: u64,
        found: u64,
    },

    /// Persisted state cannot be turned back into a valid account
    #[error("Corrupt state: {0}")]
    CorruptState(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl LedgerError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for policies
    pub fn policy_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Policy",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for policy requests
    pub fn request_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Policy request",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for usernames
    pub fn user_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "User",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the whole operation may be retried from a fresh load
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
