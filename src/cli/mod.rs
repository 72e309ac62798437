//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod export;
pub mod policy;
pub mod request;
pub mod transaction;
pub mod user;

pub use account::{handle_account_command, AccountCommands};
pub use export::{handle_export_command, ExportCommands};
pub use policy::{handle_policy_command, PolicyCommands, PolicyFieldArgs};
pub use request::{handle_request_command, RequestCommands};
pub use transaction::{handle_deposit, handle_ledger, handle_pay, handle_withdraw};
pub use user::{handle_user_command, UserCommands};

use crate::error::{LedgerError, LedgerResult};
use crate::models::Money;

/// Parse a command-line amount such as "100" or "1,000"
pub(crate) fn parse_amount(input: &str) -> LedgerResult<Money> {
    Money::parse(input).map_err(|e| {
        LedgerError::Validation(format!(
            "Invalid amount: '{}'. Use whole units like '100' or '1,000'. Error: {}",
            input, e
        ))
    })
}
