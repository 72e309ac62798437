//! JSON export of the whole ledger store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Money, Policy, PolicyId, PolicyRequest, Transaction, UserAccount};
use crate::storage::{AccountRecord, Storage};

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPolicy {
    pub id: PolicyId,
    #[serde(flatten)]
    pub policy: Policy,
}

/// Snapshot of all persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub schema_version: String,
    pub exported_at: DateTime<Utc>,
    pub app_version: String,
    pub accounts: Vec<AccountRecord>,
    pub policies: Vec<ExportedPolicy>,
    /// Oldest first
    pub transactions: Vec<Transaction>,
    pub policy_requests: Vec<PolicyRequest>,
    pub users: Vec<UserAccount>,
}

impl LedgerExport {
    pub fn from_storage(storage: &Storage) -> LedgerResult<Self> {
        let policies = storage
            .policies
            .get_all()?
            .into_iter()
            .map(|(id, policy)| ExportedPolicy { id, policy })
            .collect();

        Ok(Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            accounts: storage.accounts.get_all()?,
            policies,
            transactions: storage.ledger.get_all()?,
            policy_requests: storage.requests.get_all()?,
            users: storage.users.get_all()?,
        })
    }

    /// Check that every account's balance is explained by the exported ledger
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        for account in &self.accounts {
            if !self.policies.iter().any(|p| p.id == account.policy_id) {
                return Err(format!(
                    "Account {} references unknown policy {}",
                    account.id, account.policy_id
                ));
            }

            let net: Money = self
                .transactions
                .iter()
                .filter(|t| t.account_id() == account.id)
                .map(Transaction::signed_effect)
                .sum();
            if account.opening_balance + net != account.balance {
                return Err(format!(
                    "Account {} balance {} does not match its ledger",
                    account.id, account.balance
                ));
            }
        }
        Ok(())
    }
}

pub fn export_full_json<W: Write>(storage: &Storage, writer: W, pretty: bool) -> LedgerResult<()> {
    let export = LedgerExport::from_storage(storage)?;

    if pretty {
        serde_json::to_writer_pretty(writer, &export)
    } else {
        serde_json::to_writer(writer, &export)
    }
    .map_err(|e| LedgerError::Export(e.to_string()))
}
