//! Path management for policy-ledger
//!
//! ## Path Resolution Order
//!
//! 1. `POLICY_LEDGER_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from [`directories::ProjectDirs`]
//!    (`~/.config/policy-ledger` on Linux)

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::error::LedgerError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "POLICY_LEDGER_DATA_DIR";

/// Manages all paths used by policy-ledger
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    base_dir: PathBuf,
}

impl LedgerPaths {
    /// Resolve the base directory from the environment or the platform default
    pub fn new() -> Result<Self, LedgerError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "policy-ledger")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    LedgerError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Use an explicit base directory (tests, `--data-dir`)
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.data_dir().join("accounts.json")
    }

    pub fn policies_file(&self) -> PathBuf {
        self.data_dir().join("policies.json")
    }

    /// Global append-only ledger
    pub fn ledger_file(&self) -> PathBuf {
        self.data_dir().join("ledger.json")
    }

    pub fn policy_requests_file(&self) -> PathBuf {
        self.data_dir().join("policy_requests.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join("users.json")
    }

    /// Advisory lock file taken by every writer of this directory
    pub fn lock_file(&self) -> PathBuf {
        self.data_dir().join(".lock")
    }

    /// Create the base and data directories
    pub fn ensure_directories(&self) -> Result<(), LedgerError> {
        std::fs::create_dir_all(self.data_dir()).map_err(|e| {
            LedgerError::Io(format!(
                "Failed to create data directory {}: {}",
                self.data_dir().display(),
                e
            ))
        })
    }

    /// Whether `ledger init` has been run here
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}
