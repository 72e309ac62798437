//! Configuration module for policy-ledger
//!
//! Path resolution for the data directory and the persisted user settings
//! (default policy for new accounts, retry budget, log filter).

pub mod paths;
pub mod settings;

pub use paths::LedgerPaths;
pub use settings::Settings;
