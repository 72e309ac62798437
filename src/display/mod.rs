//! Display formatting for terminal output

pub mod account;
pub mod policy;
pub mod transaction;

pub use account::{format_account_details, format_account_list};
pub use policy::{format_policy, format_request_list};
pub use transaction::{format_ledger_table, format_transaction_outcome};
