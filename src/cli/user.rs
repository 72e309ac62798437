//! Username CLI commands

use clap::Subcommand;

use crate::error::LedgerResult;
use crate::services::{AccountService, UserService};
use crate::storage::Storage;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Attach a username to an account
    Register {
        username: String,
        /// Account id or short id
        account: String,
    },
    /// Look up the account behind a username, or the username of an account
    Lookup {
        /// Username, account id or short id
        query: String,
    },
    /// Case-insensitive partial match on usernames
    Search { query: String },
}

pub fn handle_user_command(storage: &Storage, cmd: UserCommands) -> LedgerResult<()> {
    let accounts = AccountService::new(storage);
    let service = UserService::new(storage);

    match cmd {
        UserCommands::Register { username, account } => {
            let record = accounts.resolve(&account)?;
            let user = service.register(&username, record.id)?;
            println!("Registered {} for {} ({})", user.username, record.name, record.id);
        }

        UserCommands::Lookup { query } => match service.lookup(&query) {
            Ok(user) => {
                let record = accounts.get(user.account_id)?;
                println!("{} -> {} ({})", user.username, record.name, record.id);
            }
            Err(e) if e.is_not_found() => {
                let record = accounts.resolve(&query)?;
                match service.username_for(record.id)? {
                    Some(user) => println!("{} ({}) -> {}", record.name, record.id, user.username),
                    None => println!("{} ({}) has no username", record.name, record.id),
                }
            }
            Err(e) => return Err(e),
        },

        UserCommands::Search { query } => {
            let users = service.search(&query)?;
            if users.is_empty() {
                println!("No usernames match '{}'", query);
            }
            for user in users {
                println!("{:<24} {}", user.username, user.account_id);
            }
        }
    }

    Ok(())
}
