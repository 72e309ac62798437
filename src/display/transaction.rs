//! Ledger and transaction formatting

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{Transaction, TransactionStatus};

#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "Transaction")]
    id: String,
    #[tabled(rename = "Time (UTC)")]
    timestamp: String,
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Counterparty")]
    counterparty: String,
}

impl From<&Transaction> for LedgerRow {
    fn from(tx: &Transaction) -> Self {
        let sign = if tx.flow() == crate::models::Flow::Inflow { "+" } else { "-" };
        Self {
            id: tx.id().to_string(),
            timestamp: tx.timestamp().format("%Y-%m-%d %H:%M:%S").to_string(),
            account: tx.account_id().to_string(),
            kind: tx.tx_type().to_string(),
            amount: format!("{}{}", sign, tx.amount()),
            balance: tx.current_balance().to_string(),
            status: tx.status().to_string(),
            counterparty: tx.counterparty().map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

/// Render transactions as a table, oldest first
pub fn format_ledger_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions recorded.".to_string();
    }

    let rows: Vec<LedgerRow> = transactions.iter().map(LedgerRow::from).collect();
    Table::new(rows).with(Style::psql()).to_string()
}

/// One-line result of a deposit, withdrawal or payment leg
pub fn format_transaction_outcome(tx: &Transaction) -> String {
    let verb = match tx.status() {
        TransactionStatus::Success => "succeeded",
        TransactionStatus::Declined => "was DECLINED by policy",
        TransactionStatus::Failure => "FAILED",
        TransactionStatus::Processing => "is still processing",
    };
    format!(
        "{} {} of {} on {} {}; balance {}",
        tx.id(),
        tx.tx_type(),
        tx.amount(),
        tx.account_id(),
        verb,
        tx.current_balance()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Money};

    #[test]
    fn test_empty_table() {
        assert_eq!(format_ledger_table(&[]), "No transactions recorded.");
    }

    #[test]
    fn test_table_rows() {
        let mut a = Account::new("A", Money::from_units(100));
        let mut b = Account::new("B", Money::zero());
        let (out_leg, in_leg) = a.payment(&mut b, Money::from_units(30));
        let declined = a.withdraw(Money::from_units(5000));

        let table = format_ledger_table(&[out_leg.clone(), in_leg, declined]);
        assert!(table.contains("Counterparty"));
        assert!(table.contains("-30"));
        assert!(table.contains("+30"));
        assert!(table.contains("DECLINED"));
        assert!(table.contains(&out_leg.id().to_string()));
        assert!(table.contains(&b.id().to_string()));
    }

    #[test]
    fn test_outcome_line() {
        let mut a = Account::new("A", Money::from_units(100));
        let ok = a.deposit(Money::from_units(5));
        assert!(format_transaction_outcome(&ok).contains("DEPOSIT of 5"));
        assert!(format_transaction_outcome(&ok).ends_with("succeeded; balance 105"));

        let declined = a.deposit(Money::from_units(5000));
        assert!(format_transaction_outcome(&declined).contains("DECLINED"));
    }
}
