//! Audit entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "CREATE"),
            Operation::Update => write!(f, "UPDATE"),
            Operation::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Account,
    Transaction,
    Policy,
    PolicyRequest,
    UserAccount,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Account => write!(f, "Account"),
            EntityType::Transaction => write!(f, "Transaction"),
            EntityType::Policy => write!(f, "Policy"),
            EntityType::PolicyRequest => write!(f, "PolicyRequest"),
            EntityType::UserAccount => write!(f, "UserAccount"),
        }
    }
}

/// One audited change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub entity_type: EntityType,
    pub entity_id: String,

    /// Human-readable label, e.g. the account name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditEntry {
    fn build(
        operation: Operation,
        entity_type: EntityType,
        entity_id: String,
        entity_name: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            entity_type,
            entity_id,
            entity_name,
            before: None,
            after: None,
            diff_summary: None,
        }
    }

    pub fn create<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self {
            after: serde_json::to_value(entity).ok(),
            ..Self::build(Operation::Create, entity_type, entity_id.into(), entity_name)
        }
    }

    /// Update entry; `diff_summary` is derived from the snapshots when `None`
    pub fn update<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> Self {
        let before = serde_json::to_value(before).ok();
        let after = serde_json::to_value(after).ok();
        let diff_summary = diff_summary.or_else(|| match (&before, &after) {
            (Some(b), Some(a)) => super::diff::generate_diff(b, a),
            _ => None,
        });

        Self {
            before,
            after,
            diff_summary,
            ..Self::build(Operation::Update, entity_type, entity_id.into(), entity_name)
        }
    }

    pub fn delete<T: Serialize>(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> Self {
        Self {
            before: serde_json::to_value(entity).ok(),
            ..Self::build(Operation::Delete, entity_type, entity_id.into(), entity_name)
        }
    }

    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.entity_type,
            self.entity_id
        );

        if let Some(name) = &self.entity_name {
            output.push_str(&format!(" ({})", name));
        }
        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}
