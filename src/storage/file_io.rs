//! File I/O utilities with atomic writes
//!
//! Every repository file is replaced wholesale through a temp file that is
//! flushed and synced before being renamed over the original, so a crash
//! leaves either the old or the new contents on disk.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::LedgerError;

/// Read JSON from a file, returning a default value if it doesn't exist
///
/// A file that exists but cannot be parsed is [`LedgerError::CorruptState`].
pub fn read_json<T, P>(path: P) -> Result<T, LedgerError>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| LedgerError::CorruptState(format!("Failed to parse {}: {}", path.display(), e)))
}

/// A temp file name unique to this process and write
fn temp_path_for(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Write JSON to a file atomically (write to temp, sync, then rename)
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), LedgerError>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            LedgerError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let result = (|| {
        let file = File::create(&temp_path)
            .map_err(|e| LedgerError::Storage(format!("Failed to create temp file: {}", e)))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)
            .map_err(|e| LedgerError::Storage(format!("Failed to serialize data: {}", e)))?;
        writer
            .flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush data: {}", e)))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| LedgerError::Storage(format!("Failed to sync data: {}", e)))?;

        fs::rename(&temp_path, path)
            .map_err(|e| LedgerError::Storage(format!("Failed to rename temp file: {}", e)))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
