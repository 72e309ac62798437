//! Exclusive write access to a data directory
//!
//! Writers in different processes are serialized by an advisory lock on a
//! file inside the data directory. Inside one process the thread holding
//! the lock may take it again; only the outermost guard releases the file.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use fs2::FileExt;

use crate::error::{LedgerError, LedgerResult};

use super::lock_error;

pub struct DirLock {
    path: PathBuf,
    state: Mutex<LockState>,
    released: Condvar,
}

#[derive(Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
    file: Option<File>,
}

/// Held while writing; dropping the outermost guard unlocks the file
pub struct DirLockGuard<'a> {
    lock: &'a DirLock,
    outermost: bool,
}

impl DirLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    /// Block until this thread owns the directory
    pub fn acquire(&self) -> LedgerResult<DirLockGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock().map_err(lock_error)?;

        if state.owner == Some(me) {
            state.depth += 1;
            return Ok(DirLockGuard {
                lock: self,
                outermost: false,
            });
        }

        while state.owner.is_some() {
            state = self.released.wait(state).map_err(lock_error)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| {
                LedgerError::Storage(format!("Failed to open {}: {}", self.path.display(), e))
            })?;
        file.lock_exclusive().map_err(|e| {
            LedgerError::Storage(format!("Failed to lock {}: {}", self.path.display(), e))
        })?;

        state.owner = Some(me);
        state.depth = 1;
        state.file = Some(file);

        Ok(DirLockGuard {
            lock: self,
            outermost: true,
        })
    }
}

impl DirLockGuard<'_> {
    /// False when this thread already held the lock
    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for DirLockGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .lock
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.depth = state.depth.saturating_sub(1);
        if state.depth > 0 {
            return;
        }

        if let Some(file) = state.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                tracing::warn!(path = %self.lock.path.display(), error = %e, "failed to unlock data directory");
            }
        }
        state.owner = None;
        self.lock.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_reentrant_on_same_thread() {
        let temp = TempDir::new().unwrap();
        let lock = DirLock::new(temp.path().join(".lock"));

        let outer = lock.acquire().unwrap();
        let inner = lock.acquire().unwrap();
        assert!(outer.is_outermost());
        assert!(!inner.is_outermost());
        drop(inner);
        drop(outer);

        assert!(lock.acquire().unwrap().is_outermost());
    }

    #[test]
    fn test_second_handle_waits_for_release() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".lock");
        let first = DirLock::new(&path);
        let second = DirLock::new(&path);
        let entered = AtomicBool::new(false);

        let guard = first.acquire().unwrap();
        thread::scope(|s| {
            s.spawn(|| {
                let _guard = second.acquire().unwrap();
                entered.store(true, Ordering::SeqCst);
            });

            thread::sleep(Duration::from_millis(100));
            assert!(!entered.load(Ordering::SeqCst));
            drop(guard);
        });

        assert!(entered.load(Ordering::SeqCst));
    }
}
