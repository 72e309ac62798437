//! Export module for policy-ledger
//!
//! - CSV: ledger transactions, one row per entry (spreadsheet-compatible)
//! - JSON: machine-readable snapshot of everything in storage
//! - YAML: the same snapshot, human-readable

pub mod csv;
pub mod json;
pub mod yaml;

pub use csv::export_ledger_csv;
pub use json::{export_full_json, LedgerExport, EXPORT_SCHEMA_VERSION};
pub use yaml::export_full_yaml;
