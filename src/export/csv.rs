//! CSV export of ledger transactions

use serde::Serialize;
use std::io::Write;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{AccountId, Transaction};
use crate::storage::Storage;

#[derive(Serialize)]
struct LedgerCsvRow {
    id: String,
    timestamp: String,
    account_id: String,
    account_name: String,
    #[serde(rename = "type")]
    tx_type: String,
    flow: String,
    amount: i64,
    balance: i64,
    status: String,
    counterparty: String,
}

/// Write ledger entries as CSV, oldest first
///
/// With `account` set only that account's entries are written.
pub fn export_ledger_csv<W: Write>(
    storage: &Storage,
    account: Option<AccountId>,
    writer: W,
) -> LedgerResult<usize> {
    let transactions = match account {
        Some(id) => storage.ledger.get_by_account(id)?,
        None => storage.ledger.get_all()?,
    };

    // Deleted accounts keep their ledger rows with a blank name
    let names: std::collections::HashMap<_, _> = storage
        .accounts
        .get_all()?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let mut out = ::csv::Writer::from_writer(writer);
    for tx in &transactions {
        out.serialize(row(tx, names.get(&tx.account_id()).cloned()))
            .map_err(export_error)?;
    }
    out.flush().map_err(|e| LedgerError::Export(e.to_string()))?;

    Ok(transactions.len())
}

fn row(tx: &Transaction, account_name: Option<String>) -> LedgerCsvRow {
    LedgerCsvRow {
        id: tx.id().as_uuid().to_string(),
        timestamp: tx.timestamp().to_rfc3339(),
        account_id: tx.account_id().as_uuid().to_string(),
        account_name: account_name.unwrap_or_default(),
        tx_type: tx.tx_type().to_string(),
        flow: tx.flow().to_string(),
        amount: tx.amount().units(),
        balance: tx.current_balance().units(),
        status: tx.status().to_string(),
        counterparty: tx
            .counterparty()
            .map(|c| c.as_uuid().to_string())
            .unwrap_or_default(),
    }
}

fn export_error(e: ::csv::Error) -> LedgerError {
    LedgerError::Export(e.to_string())
}
