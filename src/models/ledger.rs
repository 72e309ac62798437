//! Ledger model
//!
//! Append-only, insertion-ordered log of one account's transactions.

use serde::{Deserialize, Serialize};

use super::money::Money;
use super::transaction::Transaction;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from transactions already in chronological order
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// Append a transaction; no deduplication
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// All transactions, oldest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn last(&self) -> Option<&Transaction> {
        self.transactions.last()
    }

    /// Sum of the balance effects of every successful transaction
    pub fn net_effect(&self) -> Money {
        self.transactions.iter().map(Transaction::signed_effect).sum()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, Flow, TransactionStatus, TransactionType};
    use chrono::Utc;

    fn txn(amount: i64, flow: Flow, status: TransactionStatus) -> Transaction {
        let mut t = Transaction::new(
            None,
            AccountId::new(),
            Money::from_units(amount),
            TransactionType::Deposit,
            flow,
            Money::zero(),
            Utc::now(),
        );
        t.settle(status).unwrap();
        t
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.net_effect(), Money::zero());
        assert!(ledger.last().is_none());
    }

    #[test]
    fn test_preserves_insertion_order_and_duplicates() {
        let mut ledger = Ledger::new();
        let a = txn(10, Flow::Inflow, TransactionStatus::Success);
        let b = txn(5, Flow::Outflow, TransactionStatus::Declined);

        ledger.add_transaction(a.clone());
        ledger.add_transaction(b.clone());
        ledger.add_transaction(a.clone());

        let ids: Vec<_> = ledger.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id(), a.id()]);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_net_effect_counts_success_only() {
        let ledger = Ledger::from_transactions(vec![
            txn(100, Flow::Inflow, TransactionStatus::Success),
            txn(30, Flow::Outflow, TransactionStatus::Success),
            txn(500, Flow::Outflow, TransactionStatus::Declined),
            txn(7, Flow::Inflow, TransactionStatus::Failure),
        ]);
        assert_eq!(ledger.net_effect().units(), 70);
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let mut ledger = Ledger::new();
        ledger.add_transaction(txn(1, Flow::Inflow, TransactionStatus::Success));
        ledger.add_transaction(txn(2, Flow::Outflow, TransactionStatus::Declined));

        let first = ledger.transactions().to_vec();
        let second = ledger.transactions().to_vec();
        assert_eq!(first, second);
    }
}
