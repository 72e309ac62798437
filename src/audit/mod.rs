//! Audit log for policy-ledger
//!
//! Every create, update and delete of an account, policy, policy request or
//! username mapping is appended to `audit.log` as one JSON line carrying the
//! before/after snapshots and a short field diff. Money movements are not
//! duplicated here; the ledger already records them.

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{AuditEntry, EntityType, Operation};
pub use logger::AuditLogger;
