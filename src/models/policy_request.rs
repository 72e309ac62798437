//! Policy change requests
//!
//! An account holder asks for different limits. The request carries the
//! same field → value object that [`Policy::update_policy`] accepts and is
//! decided exactly once.
//!
//! [`Policy::update_policy`]: super::policy::Policy::update_policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::ids::{AccountId, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyRequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for PolicyRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub id: RequestId,
    pub account_id: AccountId,
    /// Requested policy fields, e.g. `{"max_deposit": 5000}`
    pub requested: Map<String, Value>,
    #[serde(default)]
    pub justification: String,
    pub status: PolicyRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PolicyRequest {
    pub fn new(
        account_id: AccountId,
        requested: Map<String, Value>,
        justification: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            account_id,
            requested,
            justification: justification.into(),
            status: PolicyRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PolicyRequestStatus::Pending
    }

    pub fn approve(&mut self) -> Result<(), PolicyRequestStatus> {
        self.decide(PolicyRequestStatus::Approved)
    }

    pub fn reject(&mut self) -> Result<(), PolicyRequestStatus> {
        self.decide(PolicyRequestStatus::Rejected)
    }

    /// Returns the current status as the error if already decided
    fn decide(&mut self, status: PolicyRequestStatus) -> Result<(), PolicyRequestStatus> {
        if !self.is_pending() {
            return Err(self.status);
        }
        self.status = status;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Compact `key=value` rendering of the requested fields
    pub fn requested_summary(&self) -> String {
        self.requested
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> PolicyRequest {
        let fields = json!({"max_deposit": 5000}).as_object().cloned().unwrap();
        PolicyRequest::new(AccountId::new(), fields, "moving house")
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = request();
        assert!(req.is_pending());
        assert_eq!(req.requested_summary(), "max_deposit=5000");
    }

    #[test]
    fn test_decided_once() {
        let mut req = request();
        req.approve().unwrap();
        assert_eq!(req.status, PolicyRequestStatus::Approved);
        assert_eq!(req.reject(), Err(PolicyRequestStatus::Approved));

        let mut req = request();
        req.reject().unwrap();
        assert_eq!(req.approve(), Err(PolicyRequestStatus::Rejected));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&PolicyRequestStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
    }
}
