//! Policy change request CLI commands

use clap::Subcommand;

use crate::display::format_request_list;
use crate::error::{LedgerError, LedgerResult};
use crate::services::{AccountService, PolicyService};
use crate::storage::Storage;

use super::policy::PolicyFieldArgs;

#[derive(Subcommand)]
pub enum RequestCommands {
    /// Ask for a policy change on an account
    Submit {
        /// Account id, short id or username
        account: String,
        #[command(flatten)]
        fields: PolicyFieldArgs,
        /// Why the change is needed
        #[arg(short, long, default_value = "")]
        justification: String,
    },
    /// List requests, optionally for one account
    List {
        /// Account id, short id or username
        account: Option<String>,
        /// Only show pending requests
        #[arg(short, long)]
        pending: bool,
    },
    /// Approve a pending request and apply it
    Approve {
        /// Request id or short id
        request: String,
    },
    /// Reject a pending request
    Reject {
        /// Request id or short id
        request: String,
    },
}

pub fn handle_request_command(storage: &Storage, cmd: RequestCommands) -> LedgerResult<()> {
    let accounts = AccountService::new(storage);
    let service = PolicyService::new(storage);

    match cmd {
        RequestCommands::Submit {
            account,
            fields,
            justification,
        } => {
            if fields.is_empty() {
                return Err(LedgerError::Validation(
                    "No policy fields requested. Use --max-deposit, --overdraft-limit, etc.".into(),
                ));
            }
            let record = accounts.resolve(&account)?;
            let request = service.submit_request(record.id, fields.to_updates(), &justification)?;
            println!("Submitted request {} for {}", request.id, record.name);
            println!("  Requested: {}", request.requested_summary());
        }

        RequestCommands::List { account, pending } => {
            let account_id = match account {
                Some(query) => Some(accounts.resolve(&query)?.id),
                None => None,
            };
            let mut requests = service.list_requests(account_id)?;
            if pending {
                requests.retain(|r| r.is_pending());
            }
            print!("{}", format_request_list(&requests));
        }

        RequestCommands::Approve { request } => {
            let (request, change) = service.approve(&request)?;
            println!("Approved request {}", request.id);
            println!("  Policy now: {} ({})", change.after, change.policy_id);
        }

        RequestCommands::Reject { request } => {
            let request = service.reject(&request)?;
            println!("Rejected request {}", request.id);
        }
    }

    Ok(())
}
