//! Account CLI commands
//!
//! Implements CLI commands for account management.

use clap::Subcommand;

use crate::config::Settings;
use crate::display::{format_account_details, format_account_list};
use crate::error::{LedgerError, LedgerResult};
use crate::services::{AccountService, UserService};
use crate::storage::Storage;

use super::parse_amount;
use super::policy::PolicyFieldArgs;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account holder name
        name: String,
        /// Initial balance in whole units
        #[arg(short, long, default_value = "0")]
        balance: String,
        /// Register a username for the account
        #[arg(short, long)]
        username: Option<String>,
        /// Overrides applied to the default policy
        #[command(flatten)]
        policy: PolicyFieldArgs,
    },
    /// List all accounts
    List,
    /// Show account details
    Show {
        /// Account id, short id or username
        account: String,
    },
    /// Rename an account
    Rename {
        /// Account id, short id or username
        account: String,
        /// New name
        name: String,
    },
    /// Delete an account; its ledger history is kept
    Delete {
        /// Account id, short id or username
        account: String,
    },
}

/// Handle an account command
pub fn handle_account_command(
    storage: &Storage,
    settings: &Settings,
    cmd: AccountCommands,
) -> LedgerResult<()> {
    let service = AccountService::new(storage);

    match cmd {
        AccountCommands::Create {
            name,
            balance,
            username,
            policy,
        } => {
            let initial = parse_amount(&balance)?;

            let mut account_policy = settings.default_policy.clone();
            account_policy
                .update_policy(&policy.to_updates())
                .map_err(|e| LedgerError::Validation(e.to_string()))?;

            // Nothing is written unless the username can be registered too
            let users = UserService::new(storage);
            let (record, user) = storage.exclusive(|| {
                if let Some(username) = &username {
                    users.check_available(username)?;
                }
                let record = service.create(&name, initial, &account_policy)?;
                let user = match &username {
                    Some(username) => Some(users.register(username, record.id)?),
                    None => None,
                };
                Ok((record, user))
            })?;

            println!("Created account: {}", record.name);
            println!("  Balance: {}", record.balance);
            println!("  Policy:  {}", account_policy);
            println!("  ID:      {}", record.id);
            if let Some(user) = user {
                println!("  User:    {}", user.username);
            }
        }

        AccountCommands::List => {
            print!("{}", format_account_list(&service.list()?));
        }

        AccountCommands::Show { account } => {
            let record = service.resolve(&account)?;
            print!("{}", format_account_details(&service.summary(record.id)?));
        }

        AccountCommands::Rename { account, name } => {
            let record = service.resolve(&account)?;
            let updated = service.rename(record.id, &name)?;
            println!("Renamed account {} to {}", record.name, updated.name);
        }

        AccountCommands::Delete { account } => {
            let record = service.resolve(&account)?;
            let deleted = service.delete(record.id)?;
            println!("Deleted account: {} ({})", deleted.name, deleted.id);
        }
    }

    Ok(())
}
