//! Storage initialization
//!
//! First-run setup: settings file, empty repository files and the default
//! policy every new account starts with.

use crate::config::paths::LedgerPaths;
use crate::config::settings::Settings;
use crate::error::LedgerResult;

use super::Storage;

/// Prepare `paths` for use; safe to run on an already initialized directory
///
/// Existing settings and data are left untouched.
pub fn initialize_storage(paths: &LedgerPaths) -> LedgerResult<Settings> {
    paths.ensure_directories()?;

    let settings = Settings::load_or_create(paths)?;
    if !paths.settings_file().exists() {
        settings.save(paths)?;
    }

    let storage = Storage::open(paths.clone())?;
    storage.exclusive(|| {
        storage.intern_policy(&settings.default_policy)?;
        storage.save_all()
    })?;

    Ok(settings)
}

pub fn needs_initialization(paths: &LedgerPaths) -> bool {
    !paths.is_initialized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, Policy};
    use tempfile::TempDir;

    #[test]
    fn test_initialize_storage() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path());

        assert!(needs_initialization(&paths));
        initialize_storage(&paths).unwrap();
        assert!(!needs_initialization(&paths));

        for file in [
            paths.accounts_file(),
            paths.policies_file(),
            paths.ledger_file(),
            paths.policy_requests_file(),
            paths.users_file(),
        ] {
            assert!(file.exists(), "{} missing", file.display());
        }

        let storage = Storage::open(paths).unwrap();
        assert!(storage.policies.contains(&Policy::default().id()).unwrap());
    }

    #[test]
    fn test_doesnt_overwrite_existing_settings() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path());

        let mut settings = Settings::default();
        settings.default_policy =
            Policy::new(Money::from_units(5), Money::from_units(5), Money::from_units(5), false, Money::zero())
                .unwrap();
        settings.save(&paths).unwrap();

        let loaded = initialize_storage(&paths).unwrap();
        assert_eq!(loaded.default_policy, settings.default_policy);

        let storage = Storage::open(paths).unwrap();
        assert!(storage.policies.contains(&settings.default_policy.id()).unwrap());
    }
}
