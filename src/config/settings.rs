//! User settings for policy-ledger

use serde::{Deserialize, Serialize};

use super::paths::LedgerPaths;
use crate::error::LedgerError;
use crate::models::Policy;
use crate::storage::file_io::{read_json, write_json_atomic};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Policy given to new accounts unless one is supplied
    #[serde(default)]
    pub default_policy: Policy,

    /// How many times an operation is re-run after a version conflict
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,

    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_policy: Policy::default(),
            conflict_retries: default_conflict_retries(),
            log_filter: default_log_filter(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or defaults if the file doesn't exist
    pub fn load_or_create(paths: &LedgerPaths) -> Result<Self, LedgerError> {
        let settings_path = paths.settings_file();
        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        read_json(&settings_path).map_err(|e| {
            LedgerError::Config(format!(
                "Failed to parse settings file {}: {}",
                settings_path.display(),
                e
            ))
        })
    }

    pub fn save(&self, paths: &LedgerPaths) -> Result<(), LedgerError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }
}
