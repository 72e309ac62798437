//! Service layer for policy-ledger
//!
//! The transaction engine plus the account, policy and username services
//! that sit on top of the storage layer.

pub mod account;
pub mod locks;
pub mod policy;
pub mod transaction;
pub mod user;

pub use account::{AccountService, AccountSummary};
pub use locks::{AccountGuard, AccountLocks};
pub use policy::{PolicyChange, PolicyService};
pub use transaction::{LoadedAccount, TransactionService, DEFAULT_CONFLICT_RETRIES};
pub use user::{UserService, SEARCH_LIMIT};
