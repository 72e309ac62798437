//! Policy request repository for JSON storage

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, PolicyRequest, RequestId};

use super::file_io::{read_json, write_json_atomic};
use super::lock_error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RequestData {
    requests: Vec<PolicyRequest>,
}

pub struct PolicyRequestRepository {
    path: PathBuf,
    data: RwLock<HashMap<RequestId, PolicyRequest>>,
}

impl PolicyRequestRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self) -> LedgerResult<()> {
        let file_data: RequestData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(lock_error)?;
        data.clear();
        data.extend(file_data.requests.into_iter().map(|r| (r.id, r)));
        Ok(())
    }

    pub fn save(&self) -> LedgerResult<()> {
        let requests = self.get_all()?;
        write_json_atomic(&self.path, &RequestData { requests })
    }

    pub fn get(&self, id: RequestId) -> LedgerResult<Option<PolicyRequest>> {
        let data = self.data.read().map_err(lock_error)?;
        Ok(data.get(&id).cloned())
    }

    /// All requests, oldest first
    pub fn get_all(&self) -> LedgerResult<Vec<PolicyRequest>> {
        let data = self.data.read().map_err(lock_error)?;

        let mut requests: Vec<_> = data.values().cloned().collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    pub fn get_by_account(&self, account_id: AccountId) -> LedgerResult<Vec<PolicyRequest>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.account_id == account_id)
            .collect())
    }

    /// Find a request by full UUID or short id
    pub fn find(&self, query: &str) -> LedgerResult<Option<PolicyRequest>> {
        let data = self.data.read().map_err(lock_error)?;

        let hits: Vec<_> = data.values().filter(|r| r.id.matches(query)).collect();
        match hits.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some((*one).clone())),
            _ => Err(LedgerError::Validation(format!(
                "Request id '{}' is ambiguous; use more characters",
                query
            ))),
        }
    }

    pub fn upsert(&self, request: PolicyRequest) -> LedgerResult<()> {
        let mut data = self.data.write().map_err(lock_error)?;
        data.insert(request.id, request);
        Ok(())
    }
}
