//! Global ledger repository
//!
//! Every transaction of every account, in the order it was recorded, kept in
//! ledger.json. Entries are only ever appended; per-account views are
//! served from an index of positions into the global sequence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Money, Transaction};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerData {
    transactions: Vec<Transaction>,
}

#[derive(Default)]
struct LedgerIndex {
    entries: Vec<Transaction>,
    by_account: HashMap<AccountId, Vec<usize>>,
}

impl LedgerIndex {
    fn push(&mut self, tx: Transaction) {
        self.by_account
            .entry(tx.account_id())
            .or_default()
            .push(self.entries.len());
        self.entries.push(tx);
    }

    fn truncate(&mut self, len: usize) {
        for tx in self.entries.drain(len..) {
            if let Some(positions) = self.by_account.get_mut(&tx.account_id()) {
                positions.retain(|&pos| pos < len);
            }
        }
    }

    fn for_account(&self, account_id: AccountId) -> impl Iterator<Item = &Transaction> {
        self.by_account
            .get(&account_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |&pos| self.entries.get(pos))
    }
}

pub struct LedgerRepository {
    path: PathBuf,
    data: RwLock<LedgerIndex>,
}

impl LedgerRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(LedgerIndex::default()),
        }
    }

    pub fn load(&self) -> LedgerResult<()> {
        let file_data: LedgerData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(lock_error)?;
        *data = LedgerIndex::default();
        for tx in file_data.transactions {
            data.push(tx);
        }

        Ok(())
    }

    pub fn save(&self) -> LedgerResult<()> {
        let data = self.data.read().map_err(lock_error)?;
        write_json_atomic(
            &self.path,
            &LedgerData {
                transactions: data.entries.clone(),
            },
        )
    }

    /// Append entries and persist them
    ///
    /// If the file cannot be written the in-memory ledger is rolled back, so
    /// memory and disk never disagree about what was recorded.
    pub fn append(&self, entries: &[Transaction]) -> LedgerResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut data = self.data.write().map_err(lock_error)?;
        let previous_len = data.entries.len();
        for tx in entries {
            data.push(tx.clone());
        }

        let file_data = LedgerData {
            transactions: data.entries.clone(),
        };
        if let Err(e) = write_json_atomic(&self.path, &file_data) {
            data.truncate(previous_len);
            return Err(e);
        }

        Ok(())
    }

    /// System-wide view in recording order
    pub fn get_all(&self) -> LedgerResult<Vec<Transaction>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.entries.clone())
    }

    /// One account's entries in recording order
    pub fn get_by_account(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.for_account(account_id).cloned().collect())
    }

    /// Net balance effect of an account's successful entries
    pub fn net_effect(&self, account_id: AccountId) -> LedgerResult<Money> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.for_account(account_id).map(Transaction::signed_effect).sum())
    }

    /// Find an entry by full UUID or short id
    pub fn find(&self, query: &str) -> LedgerResult<Option<Transaction>> {
        let data = self.data.read().map_err(lock_error)?;

        let mut hits = data.entries.iter().filter(|t| t.id().matches(query));
        let first = hits.next().cloned();
        if hits.next().is_some() {
            return Err(LedgerError::Validation(format!(
                "Transaction id '{}' is ambiguous; use more characters",
                query
            )));
        }
        Ok(first)
    }

    pub fn len(&self) -> LedgerResult<usize> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.entries.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }
}
