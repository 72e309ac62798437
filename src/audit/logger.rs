//! Append-only JSONL audit log writer

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, LedgerResult};

use super::entry::AuditEntry;

pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append one entry and flush
    pub fn log(&self, entry: &AuditEntry) -> LedgerResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| LedgerError::Json(format!("Failed to serialize audit entry: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| LedgerError::Io(format!("Failed to open audit log: {}", e)))?;

        writeln!(file, "{}", json)
            .and_then(|_| file.flush())
            .map_err(|e| LedgerError::Io(format!("Failed to write audit entry: {}", e)))
    }

    /// All entries, oldest first
    pub fn read_all(&self) -> LedgerResult<Vec<AuditEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| LedgerError::Io(format!("Failed to open audit log: {}", e)))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                LedgerError::Io(format!("Failed to read audit log line {}: {}", line_num + 1, e))
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let entry = serde_json::from_str(&line).map_err(|e| {
                LedgerError::Json(format!(
                    "Failed to parse audit entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// The last `count` entries, oldest first
    pub fn read_recent(&self, count: usize) -> LedgerResult<Vec<AuditEntry>> {
        let mut all = self.read_all()?;
        let start = all.len().saturating_sub(count);
        Ok(all.split_off(start))
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::{EntityType, Operation};
    use serde_json::json;
    use tempfile::TempDir;

    fn logger() -> (AuditLogger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let logger = AuditLogger::new(temp_dir.path().join("audit.log"));
        (logger, temp_dir)
    }

    #[test]
    fn test_empty_log() {
        let (logger, _temp) = logger();
        assert!(logger.read_all().unwrap().is_empty());
        assert!(!logger.path().exists());
    }

    #[test]
    fn test_log_and_read_recent() {
        let (logger, _temp) = logger();
        for i in 0..6 {
            let entry = AuditEntry::create(
                EntityType::UserAccount,
                format!("user-{}", i),
                None,
                &json!({"index": i}),
            );
            logger.log(&entry).unwrap();
        }

        let all = logger.read_all().unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].operation, Operation::Create);

        let recent = logger.read_recent(2).unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["user-4", "user-5"]);
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let (logger, _temp) = logger();
        std::fs::write(logger.path(), "{\"not\": \"an entry\"}\n").unwrap();
        let err = logger.read_all().unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
