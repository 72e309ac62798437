//! Policy CLI commands

use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use crate::display::format_policy;
use crate::error::{LedgerError, LedgerResult};
use crate::services::{AccountService, PolicyService};
use crate::storage::Storage;

/// Policy fields settable from the command line
#[derive(Args, Debug, Default, Clone)]
pub struct PolicyFieldArgs {
    /// Largest single deposit
    #[arg(long)]
    pub max_deposit: Option<i64>,
    /// Largest single withdrawal
    #[arg(long)]
    pub max_withdrawal: Option<i64>,
    /// Daily withdrawal limit (stored, not enforced)
    #[arg(long)]
    pub daily_withdrawal_limit: Option<i64>,
    /// Whether the balance may go below zero
    #[arg(long)]
    pub allow_negative_balance: Option<bool>,
    /// How far below zero the balance may go
    #[arg(long)]
    pub overdraft_limit: Option<i64>,
}

impl PolicyFieldArgs {
    /// The given flags as a field -> value patch
    pub fn to_updates(&self) -> Map<String, Value> {
        let mut updates = Map::new();
        let limits = [
            ("max_deposit", self.max_deposit),
            ("max_withdrawal", self.max_withdrawal),
            ("daily_withdrawal_limit", self.daily_withdrawal_limit),
            ("overdraft_limit", self.overdraft_limit),
        ];
        for (field, value) in limits {
            if let Some(v) = value {
                updates.insert(field.to_string(), Value::from(v));
            }
        }
        if let Some(allow) = self.allow_negative_balance {
            updates.insert("allow_negative_balance".to_string(), Value::Bool(allow));
        }
        updates
    }

    pub fn is_empty(&self) -> bool {
        self.to_updates().is_empty()
    }
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Show the policy governing an account
    Show {
        /// Account id, short id or username
        account: String,
    },
    /// Change an account's policy directly
    Update {
        /// Account id, short id or username
        account: String,
        #[command(flatten)]
        fields: PolicyFieldArgs,
    },
}

pub fn handle_policy_command(storage: &Storage, cmd: PolicyCommands) -> LedgerResult<()> {
    let accounts = AccountService::new(storage);
    let service = PolicyService::new(storage);

    match cmd {
        PolicyCommands::Show { account } => {
            let record = accounts.resolve(&account)?;
            let (id, policy) = service.for_account(record.id)?;
            println!("{} ({})", record.name, record.id);
            print!("{}", format_policy(&id, &policy));
        }

        PolicyCommands::Update { account, fields } => {
            if fields.is_empty() {
                return Err(LedgerError::Validation(
                    "No policy fields given. Use --max-deposit, --overdraft-limit, etc.".into(),
                ));
            }
            let record = accounts.resolve(&account)?;
            let change = service.update(record.id, &fields.to_updates())?;

            if change.before == change.after {
                println!("Policy unchanged for {}", record.name);
            } else {
                println!("Updated policy for {}", record.name);
                println!("  Before: {}", change.before);
                println!("  After:  {}", change.after);
            }
        }
    }

    Ok(())
}
