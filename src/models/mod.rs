//! Core data models for the policy ledger
//!
//! Money, identifiers, policies, transactions and ledgers, plus the
//! [`Account`] state machine that ties them together. Nothing in here does
//! I/O or locking.

pub mod account;
pub mod ids;
pub mod ledger;
pub mod money;
pub mod policy;
pub mod policy_request;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use ids::{AccountId, PolicyId, RequestId, TransactionId};
pub use ledger::Ledger;
pub use money::{Money, MoneyParseError};
pub use policy::{Policy, PolicyUpdateError};
pub use policy_request::{PolicyRequest, PolicyRequestStatus};
pub use transaction::{Flow, StatusTransitionError, Transaction, TransactionStatus, TransactionType};
pub use user::{normalize_username, UserAccount};
