//! Per-account mutation rights
//!
//! At most one engine operation may be mutating a given account at a time.
//! Operations that touch several accounts take them in ascending id order,
//! so two payments running in opposite directions cannot deadlock.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

use crate::error::{LedgerError, LedgerResult};
use crate::models::AccountId;

#[derive(Debug, Default)]
pub struct AccountLocks {
    held: Mutex<HashSet<AccountId>>,
    released: Condvar,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every account in `ids` is free, then hold them all
    ///
    /// Duplicate ids are taken once. The rights are released when the
    /// returned guard is dropped.
    pub fn acquire(&self, ids: &[AccountId]) -> LedgerResult<AccountGuard<'_>> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guard = AccountGuard {
            locks: self,
            ids: Vec::with_capacity(ordered.len()),
        };

        for id in ordered {
            let mut held = self.held.lock().map_err(poisoned)?;
            while held.contains(&id) {
                held = self.released.wait(held).map_err(poisoned)?;
            }
            held.insert(id);
            guard.ids.push(id);
        }

        Ok(guard)
    }

    /// Whether any operation currently holds `id`
    pub fn is_held(&self, id: AccountId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

fn poisoned<E>(_: E) -> LedgerError {
    LedgerError::Storage("Account lock table poisoned".into())
}

/// Held mutation rights; released on drop
#[must_use = "rights are released as soon as the guard is dropped"]
pub struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    ids: Vec<AccountId>,
}

impl AccountGuard<'_> {
    pub fn ids(&self) -> &[AccountId] {
        &self.ids
    }
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
