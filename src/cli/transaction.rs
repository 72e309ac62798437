//! Money movement and ledger CLI commands

use crate::config::Settings;
use crate::display::{format_ledger_table, format_transaction_outcome};
use crate::error::LedgerResult;
use crate::services::{AccountLocks, AccountService, TransactionService};
use crate::storage::Storage;

use super::parse_amount;

/// Other `ledger` processes are held off by the storage write lock;
/// `locks` only orders threads within this one
fn engine<'a>(
    storage: &'a Storage,
    locks: &'a AccountLocks,
    settings: &Settings,
) -> TransactionService<'a, Storage> {
    TransactionService::new(storage, locks).with_retries(settings.conflict_retries)
}

pub fn handle_deposit(
    storage: &Storage,
    settings: &Settings,
    account: &str,
    amount: &str,
) -> LedgerResult<()> {
    let record = AccountService::new(storage).resolve(account)?;
    let amount = parse_amount(amount)?;

    let locks = AccountLocks::new();
    let tx = engine(storage, &locks, settings).deposit(record.id, amount)?;
    println!("{}", format_transaction_outcome(&tx));
    Ok(())
}

pub fn handle_withdraw(
    storage: &Storage,
    settings: &Settings,
    account: &str,
    amount: &str,
) -> LedgerResult<()> {
    let record = AccountService::new(storage).resolve(account)?;
    let amount = parse_amount(amount)?;

    let locks = AccountLocks::new();
    let tx = engine(storage, &locks, settings).withdraw(record.id, amount)?;
    println!("{}", format_transaction_outcome(&tx));
    Ok(())
}

pub fn handle_pay(
    storage: &Storage,
    settings: &Settings,
    from: &str,
    to: &str,
    amount: &str,
) -> LedgerResult<()> {
    let accounts = AccountService::new(storage);
    let payer = accounts.resolve(from)?;
    let payee = accounts.resolve(to)?;
    let amount = parse_amount(amount)?;

    let locks = AccountLocks::new();
    let (out_leg, in_leg) = engine(storage, &locks, settings).pay(payer.id, payee.id, amount)?;
    println!("{}", format_transaction_outcome(&out_leg));
    println!("{}", format_transaction_outcome(&in_leg));
    Ok(())
}

/// Print one account's ledger, or the global ledger
pub fn handle_ledger(storage: &Storage, account: Option<&str>, limit: Option<usize>) -> LedgerResult<()> {
    let mut transactions = match account {
        Some(query) => {
            let accounts = AccountService::new(storage);
            let record = accounts.resolve(query)?;
            println!("Ledger for {} ({}): balance {}", record.name, record.id, record.balance);
            accounts.history(record.id)?
        }
        None => storage.ledger.get_all()?,
    };

    if let Some(limit) = limit {
        let skip = transactions.len().saturating_sub(limit);
        transactions.drain(..skip);
    }

    println!("{}", format_ledger_table(&transactions));
    Ok(())
}
