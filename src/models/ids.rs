//! Strongly-typed ID wrappers for all entity types
//!
//! Account, transaction and request ids are random UUIDs. Policy ids are
//! content hashes, so structurally identical policies share one id.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse an ID from a full UUID string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Short display form, e.g. `acc-1a2b3c4d`
            pub fn short(&self) -> String {
                format!("{}{}", $display_prefix, &self.0.simple().to_string()[..8])
            }

            /// Whether `s` names this id, either in full or in short form
            pub fn matches(&self, s: &str) -> bool {
                let s = s.trim();
                if let Ok(uuid) = Uuid::parse_str(s) {
                    return uuid == self.0;
                }
                let s = s.strip_prefix($display_prefix).unwrap_or(s).to_lowercase();
                s.len() >= 8 && self.0.simple().to_string().starts_with(&s)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.short())
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if let Ok(uuid) = Uuid::parse_str(s) {
                    return Ok(Self(uuid));
                }
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(AccountId, "acc-");
define_id!(TransactionId, "txn-");
define_id!(RequestId, "req-");

/// Content-derived identifier of a policy
///
/// Lowercase hex SHA-256 of the five policy fields joined with `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    /// Hash the canonical field string of a policy
    pub fn from_fields(
        max_deposit: i64,
        max_withdrawal: i64,
        daily_withdrawal_limit: i64,
        allow_negative_balance: bool,
        overdraft_limit: i64,
    ) -> Self {
        let canonical = format!(
            "{}-{}-{}-{}-{}",
            max_deposit, max_withdrawal, daily_withdrawal_limit, allow_negative_balance, overdraft_limit
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pol-{}", &self.0[..self.0.len().min(12)])
    }
}
