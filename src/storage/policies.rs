//! Policy repository for JSON storage
//!
//! Policies are keyed by their content hash, so saving a policy that already
//! exists is a no-op and accounts with identical limits share one entry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::LedgerResult;
use crate::models::{Policy, PolicyId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PolicyData {
    policies: Vec<StoredPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPolicy {
    id: PolicyId,
    #[serde(flatten)]
    policy: Policy,
}

pub struct PolicyRepository {
    path: PathBuf,
    data: RwLock<HashMap<PolicyId, Policy>>,
}

impl PolicyRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Load policies, re-deriving every id from the stored fields
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: PolicyData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(lock_error)?;
        data.clear();
        for stored in file_data.policies {
            let id = stored.policy.id();
            if id != stored.id {
                tracing::warn!(stored = %stored.id, derived = %id, "policy id did not match its fields");
            }
            data.insert(id, stored.policy);
        }

        Ok(())
    }

    pub fn save(&self) -> LedgerResult<()> {
        let data = self.data.read().map_err(lock_error)?;

        let mut policies: Vec<_> = data
            .iter()
            .map(|(id, policy)| StoredPolicy {
                id: id.clone(),
                policy: policy.clone(),
            })
            .collect();
        policies.sort_by(|a, b| a.id.cmp(&b.id));

        write_json_atomic(&self.path, &PolicyData { policies })
    }

    pub fn get(&self, id: &PolicyId) -> LedgerResult<Option<Policy>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(id).cloned())
    }

    pub fn contains(&self, id: &PolicyId) -> LedgerResult<bool> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.contains_key(id))
    }

    /// Store `policy` unless an identical one exists
    ///
    /// Returns its id and whether it was newly added.
    pub fn intern(&self, policy: &Policy) -> LedgerResult<(PolicyId, bool)> {
        let mut data = self.data.write().map_err(lock_error)?;

        let id = policy.id();
        if data.contains_key(&id) {
            return Ok((id, false));
        }
        data.insert(id.clone(), policy.clone());
        Ok((id, true))
    }

    pub fn get_all(&self) -> LedgerResult<Vec<(PolicyId, Policy)>> {
        let data = self.data.read().map_err(lock_error)?;

        let mut policies: Vec<_> = data.iter().map(|(id, p)| (id.clone(), p.clone())).collect();
        policies.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(policies)
    }
}
