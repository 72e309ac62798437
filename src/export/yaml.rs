//! YAML export of the whole ledger store

use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::export::json::LedgerExport;
use crate::storage::Storage;

pub fn export_full_yaml<W: Write>(storage: &Storage, mut writer: W) -> LedgerResult<()> {
    let export = LedgerExport::from_storage(storage)?;

    writeln!(writer, "# policy-ledger export")?;
    writeln!(writer, "# Generated: {}", export.exported_at)?;
    writeln!(writer, "# App Version: {}", export.app_version)?;
    writeln!(writer)?;

    serde_yaml::to_writer(writer, &export).map_err(|e| LedgerError::Export(e.to_string()))
}
