//! Policy service
//!
//! Direct policy changes and the request → approve/reject workflow. A
//! changed policy is stored under its new content hash and the account is
//! re-pointed at it; the old entry stays for any other account sharing it.

use serde_json::{Map, Value};

use crate::audit::EntityType;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Policy, PolicyId, PolicyRequest};
use crate::storage::Storage;

use super::account::AccountService;

pub struct PolicyService<'a> {
    storage: &'a Storage,
}

/// Result of applying a policy change to an account
#[derive(Debug, Clone)]
pub struct PolicyChange {
    pub account_id: AccountId,
    pub before: Policy,
    pub after: Policy,
    pub policy_id: PolicyId,
}

impl<'a> PolicyService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// The policy currently governing an account
    pub fn for_account(&self, account_id: AccountId) -> LedgerResult<(PolicyId, Policy)> {
        let record = AccountService::new(self.storage).get(account_id)?;
        let policy = self
            .storage
            .policies
            .get(&record.policy_id)?
            .ok_or_else(|| LedgerError::policy_not_found(record.policy_id.to_string()))?;
        Ok((record.policy_id, policy))
    }

    /// Apply a field → value patch to an account's policy
    pub fn update(&self, account_id: AccountId, updates: &Map<String, Value>) -> LedgerResult<PolicyChange> {
        self.storage.exclusive(|| self.apply_update(account_id, updates))
    }

    fn apply_update(&self, account_id: AccountId, updates: &Map<String, Value>) -> LedgerResult<PolicyChange> {
        let (_, before) = self.for_account(account_id)?;

        let mut after = before.clone();
        after
            .update_policy(updates)
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        let policy_id = self.storage.intern_policy(&after)?;
        if after != before {
            AccountService::new(self.storage).set_policy(account_id, policy_id.clone())?;
            tracing::info!(account = %account_id, policy = %policy_id, "policy updated");
        }

        Ok(PolicyChange {
            account_id,
            before,
            after,
            policy_id,
        })
    }

    /// File a change request after checking the requested values are usable
    pub fn submit_request(
        &self,
        account_id: AccountId,
        requested: Map<String, Value>,
        justification: &str,
    ) -> LedgerResult<PolicyRequest> {
        self.storage
            .exclusive(|| self.file_request(account_id, requested, justification))
    }

    fn file_request(
        &self,
        account_id: AccountId,
        requested: Map<String, Value>,
        justification: &str,
    ) -> LedgerResult<PolicyRequest> {
        let (_, current) = self.for_account(account_id)?;

        let mut preview = current.clone();
        preview
            .update_policy(&requested)
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        if preview == current {
            return Err(LedgerError::Validation(
                "Request does not change any policy field".into(),
            ));
        }

        let request = PolicyRequest::new(account_id, requested, justification.trim());
        self.storage.requests.upsert(request.clone())?;
        self.storage.requests.save()?;

        self.storage.log_create(
            EntityType::PolicyRequest,
            request.id.to_string(),
            None,
            &request,
        )?;

        Ok(request)
    }

    /// Requests for one account, or all of them, oldest first
    pub fn list_requests(&self, account_id: Option<AccountId>) -> LedgerResult<Vec<PolicyRequest>> {
        match account_id {
            Some(id) => self.storage.requests.get_by_account(id),
            None => self.storage.requests.get_all(),
        }
    }

    pub fn find_request(&self, query: &str) -> LedgerResult<PolicyRequest> {
        self.storage
            .requests
            .find(query)?
            .ok_or_else(|| LedgerError::request_not_found(query))
    }

    /// Approve a pending request and apply its values
    pub fn approve(&self, query: &str) -> LedgerResult<(PolicyRequest, PolicyChange)> {
        self.storage.exclusive(|| {
            let before = self.find_request(query)?;
            let mut request = before.clone();
            request.approve().map_err(|status| already_decided(&request, status))?;

            let change = self.apply_update(request.account_id, &request.requested)?;
            self.finish(&before, &request)?;
            Ok((request, change))
        })
    }

    /// Reject a pending request; the policy is left alone
    pub fn reject(&self, query: &str) -> LedgerResult<PolicyRequest> {
        self.storage.exclusive(|| {
            let before = self.find_request(query)?;
            let mut request = before.clone();
            request.reject().map_err(|status| already_decided(&request, status))?;

            self.finish(&before, &request)?;
            Ok(request)
        })
    }

    fn finish(&self, before: &PolicyRequest, after: &PolicyRequest) -> LedgerResult<()> {
        self.storage.requests.upsert(after.clone())?;
        self.storage.requests.save()?;
        self.storage.log_update(
            EntityType::PolicyRequest,
            after.id.to_string(),
            None,
            before,
            after,
            Some(format!("status: {} -> {}", before.status, after.status)),
        )
    }
}

fn already_decided(request: &PolicyRequest, status: impl std::fmt::Display) -> LedgerError {
    LedgerError::Validation(format!("Request {} is already {}", request.id, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{Money, PolicyRequestStatus};
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage, AccountId) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(LedgerPaths::with_base_dir(temp_dir.path())).unwrap();
        let id = AccountService::new(&storage)
            .create("Alice", Money::from_units(100), &Policy::default())
            .unwrap()
            .id;
        (temp_dir, storage, id)
    }

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_update_repoints_account() {
        let (_temp, storage, id) = setup();
        let service = PolicyService::new(&storage);

        let change = service
            .update(id, &patch(json!({"maxDeposit": 5000})))
            .unwrap();
        assert_eq!(change.after.max_deposit(), Money::from_units(5000));

        let (policy_id, policy) = service.for_account(id).unwrap();
        assert_eq!(policy_id, change.policy_id);
        assert_eq!(policy, change.after);
        // the default policy is kept for other accounts
        assert!(storage.policies.contains(&Policy::default().id()).unwrap());
    }

    #[test]
    fn test_update_with_bad_value_changes_nothing() {
        let (_temp, storage, id) = setup();
        let service = PolicyService::new(&storage);

        let err = service
            .update(id, &patch(json!({"max_deposit": 10, "overdraft_limit": -1})))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(service.for_account(id).unwrap().1, Policy::default());
    }

    #[test]
    fn test_request_approve_flow() {
        let (_temp, storage, id) = setup();
        let service = PolicyService::new(&storage);

        let request = service
            .submit_request(id, patch(json!({"overdraft_limit": 500})), "travel")
            .unwrap();
        assert_eq!(service.list_requests(Some(id)).unwrap().len(), 1);

        let (approved, change) = service.approve(&request.id.to_string()).unwrap();
        assert_eq!(approved.status, PolicyRequestStatus::Approved);
        assert_eq!(change.after.overdraft_limit(), Money::from_units(500));
        assert_eq!(service.for_account(id).unwrap().1.overdraft_limit(), Money::from_units(500));

        let err = service.reject(&request.id.to_string()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_reject_leaves_policy() {
        let (_temp, storage, id) = setup();
        let service = PolicyService::new(&storage);

        let request = service
            .submit_request(id, patch(json!({"max_withdrawal": 9000})), "")
            .unwrap();
        let rejected = service.reject(&request.id.to_string()).unwrap();
        assert_eq!(rejected.status, PolicyRequestStatus::Rejected);
        assert_eq!(service.for_account(id).unwrap().1, Policy::default());
    }

    #[test]
    fn test_submit_rejects_noop_and_invalid() {
        let (_temp, storage, id) = setup();
        let service = PolicyService::new(&storage);

        assert!(service
            .submit_request(id, patch(json!({"favourite": 1})), "")
            .unwrap_err()
            .is_validation());
        assert!(service
            .submit_request(id, patch(json!({"max_deposit": "lots"})), "")
            .unwrap_err()
            .is_validation());
        assert!(service.list_requests(None).unwrap().is_empty());
    }
}
