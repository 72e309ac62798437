//! Account model
//!
//! The in-memory account is the policy-governed state machine: every balance
//! change goes through [`Account::deposit`], [`Account::withdraw`] or
//! [`Account::payment`], is checked against the account's [`Policy`], and is
//! recorded in its [`Ledger`] whether it succeeds or is declined.
//!
//! Instances are short-lived. They are rebuilt from persisted state for each
//! operation and discarded once the outcome has been committed.

use chrono::Utc;
use std::fmt;

use super::ids::AccountId;
use super::ledger::Ledger;
use super::money::Money;
use super::policy::Policy;
use super::transaction::{Flow, Transaction, TransactionStatus, TransactionType};

#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    name: String,
    balance: Money,
    policy: Policy,
    ledger: Ledger,
}

impl Account {
    /// Create an account with the default policy and an empty ledger
    pub fn new(name: impl Into<String>, balance: Money) -> Self {
        Self::with_policy(name, balance, Policy::default())
    }

    /// Create an account with a custom policy
    pub fn with_policy(name: impl Into<String>, balance: Money, policy: Policy) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            balance,
            policy,
            ledger: Ledger::new(),
        }
    }

    /// Rebuild an account from persisted state
    pub fn restore(
        id: AccountId,
        name: impl Into<String>,
        balance: Money,
        policy: Policy,
        ledger: Ledger,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            balance,
            policy,
            ledger,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Balance before any transaction in the ledger was applied
    pub fn opening_balance(&self) -> Money {
        self.balance - self.ledger.net_effect()
    }

    /// Deposit `amount`, or record a decline if the policy refuses it
    pub fn deposit(&mut self, amount: Money) -> Transaction {
        let credited = self
            .balance
            .checked_add(amount)
            .filter(|_| self.policy.validate_deposit(amount));
        let (new_balance, status) = match credited {
            Some(balance) => (balance, TransactionStatus::Success),
            None => (self.balance, TransactionStatus::Declined),
        };

        self.record(amount, TransactionType::Deposit, Flow::Inflow, new_balance, status)
    }

    /// Withdraw `amount`, or record a decline if the policy refuses it
    pub fn withdraw(&mut self, amount: Money) -> Transaction {
        let debited = self
            .balance
            .checked_sub(amount)
            .filter(|_| self.policy.validate_withdrawal(amount, self.balance));
        let (new_balance, status) = match debited {
            Some(balance) => (balance, TransactionStatus::Success),
            None => (self.balance, TransactionStatus::Declined),
        };

        self.record(amount, TransactionType::Withdrawal, Flow::Outflow, new_balance, status)
    }

    /// Pay `amount` from this account to `payee`
    ///
    /// Succeeds only if this account's policy allows the withdrawal and the
    /// payee's policy allows the deposit. Both legs are PAY transactions with a
    /// shared timestamp and each other's account as counterparty; on a decline
    /// both are DECLINED and neither balance moves. Returns `(payer, payee)`.
    pub fn payment(&mut self, payee: &mut Account, amount: Money) -> (Transaction, Transaction) {
        let payer_ok = self.policy.validate_withdrawal(amount, self.balance);
        let payee_ok = payee.policy.validate_deposit(amount);
        let settled = match (self.balance.checked_sub(amount), payee.balance.checked_add(amount)) {
            (Some(payer_balance), Some(payee_balance)) if payer_ok && payee_ok => {
                Some((payer_balance, payee_balance))
            }
            _ => None,
        };

        let (payer_balance, payee_balance, status) = match settled {
            Some((payer_balance, payee_balance)) => {
                (payer_balance, payee_balance, TransactionStatus::Success)
            }
            None => (self.balance, payee.balance, TransactionStatus::Declined),
        };

        let timestamp = Utc::now();

        let payer_tx = Transaction::new(
            None,
            self.id,
            amount,
            TransactionType::Pay,
            Flow::Outflow,
            payer_balance,
            timestamp,
        )
        .with_counterparty(payee.id)
        .with_outcome(status);

        let payee_tx = Transaction::new(
            None,
            payee.id,
            amount,
            TransactionType::Pay,
            Flow::Inflow,
            payee_balance,
            timestamp,
        )
        .with_counterparty(self.id)
        .with_outcome(status);

        self.balance = payer_balance;
        payee.balance = payee_balance;
        self.ledger.add_transaction(payer_tx.clone());
        payee.ledger.add_transaction(payee_tx.clone());

        (payer_tx, payee_tx)
    }

    fn record(
        &mut self,
        amount: Money,
        tx_type: TransactionType,
        flow: Flow,
        new_balance: Money,
        status: TransactionStatus,
    ) -> Transaction {
        let tx = Transaction::new(None, self.id, amount, tx_type, flow, new_balance, Utc::now())
            .with_outcome(status);

        self.balance = new_balance;
        self.ledger.add_transaction(tx.clone());
        tx
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.id, self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: i64) -> Money {
        Money::from_units(n)
    }

    fn no_overdraft() -> Policy {
        Policy::new(units(5000), units(2000), units(10000), false, units(100)).unwrap()
    }

    #[test]
    fn test_new_account() {
        let account = Account::new("Test User", units(1000));
        assert_eq!(account.name(), "Test User");
        assert_eq!(account.balance(), units(1000));
        assert_eq!(account.policy(), &Policy::default());
        assert!(account.ledger().is_empty());
    }

    #[test]
    fn test_deposit_at_limit_succeeds() {
        let mut account = Account::new("A", units(0));
        let tx = account.deposit(units(1000));

        assert_eq!(tx.status(), TransactionStatus::Success);
        assert_eq!(tx.tx_type(), TransactionType::Deposit);
        assert_eq!(tx.current_balance(), units(1000));
        assert_eq!(account.balance(), units(1000));
        assert_eq!(account.ledger().len(), 1);
    }

    #[test]
    fn test_deposit_over_limit_is_declined_and_recorded() {
        let mut account = Account::new("A", units(200));
        let tx = account.deposit(units(1001));

        assert_eq!(tx.status(), TransactionStatus::Declined);
        assert_eq!(tx.current_balance(), units(200));
        assert_eq!(account.balance(), units(200));
        assert_eq!(account.ledger().transactions()[0], tx);
    }

    #[test]
    fn test_negative_deposit_is_declined() {
        let mut account = Account::new("A", units(200));
        let tx = account.deposit(units(-10));
        assert_eq!(tx.status(), TransactionStatus::Declined);
        assert_eq!(account.balance(), units(200));
    }

    #[test]
    fn test_negative_withdrawal_is_declined() {
        let mut account = Account::new("A", units(200));
        let tx = account.withdraw(units(-5000));
        assert_eq!(tx.status(), TransactionStatus::Declined);
        assert_eq!(account.balance(), units(200));
    }

    #[test]
    fn test_deposit_that_would_overflow_is_declined() {
        let max = units(i64::MAX);
        let roomy = Policy::new(max, units(1000), units(10000), true, units(50)).unwrap();
        let mut account = Account::with_policy("A", units(1), roomy);

        let tx = account.deposit(max);
        assert_eq!(tx.status(), TransactionStatus::Declined);
        assert_eq!(account.balance(), units(1));
        assert_eq!(tx.current_balance(), units(1));
    }

    #[test]
    fn test_payment_that_would_overflow_payee_is_declined() {
        let max = units(i64::MAX);
        let roomy = Policy::new(max, max, units(10000), true, max).unwrap();
        let mut a = Account::with_policy("A", units(10), roomy.clone());
        let mut b = Account::with_policy("B", units(i64::MAX - 5), roomy);

        let (payer, payee) = a.payment(&mut b, units(10));
        assert_eq!(payer.status(), TransactionStatus::Declined);
        assert_eq!(payee.status(), TransactionStatus::Declined);
        assert_eq!(a.balance(), units(10));
        assert_eq!(b.balance(), units(i64::MAX - 5));
    }

    #[test]
    fn test_negative_payment_is_declined() {
        let mut a = Account::new("A", units(100));
        let mut b = Account::new("B", units(100));

        let (payer, _) = a.payment(&mut b, units(-50));
        assert_eq!(payer.status(), TransactionStatus::Declined);
        assert_eq!(a.balance(), units(100));
        assert_eq!(b.balance(), units(100));
    }

    #[test]
    fn test_withdraw_entire_balance_without_overdraft() {
        let mut account = Account::with_policy("A", units(300), no_overdraft());
        let tx = account.withdraw(units(300));
        assert_eq!(tx.status(), TransactionStatus::Success);
        assert_eq!(account.balance(), Money::zero());

        let mut account = Account::with_policy("B", units(300), no_overdraft());
        let tx = account.withdraw(units(301));
        assert_eq!(tx.status(), TransactionStatus::Declined);
        assert_eq!(account.balance(), units(300));
    }

    #[test]
    fn test_withdraw_into_overdraft() {
        let mut account = Account::new("A", units(0));
        let tx = account.withdraw(units(50));
        assert_eq!(tx.status(), TransactionStatus::Success);
        assert_eq!(account.balance(), units(-50));

        let mut account = Account::new("B", units(0));
        let tx = account.withdraw(units(51));
        assert_eq!(tx.status(), TransactionStatus::Declined);
        assert_eq!(account.balance(), Money::zero());
    }

    #[test]
    fn test_payment_success() {
        let mut a = Account::new("A", units(1000));
        let mut b = Account::new("B", units(500));

        let (payer, payee) = a.payment(&mut b, units(200));

        assert_eq!(a.balance(), units(800));
        assert_eq!(b.balance(), units(700));
        assert_eq!(payer.status(), TransactionStatus::Success);
        assert_eq!(payee.status(), TransactionStatus::Success);
        assert_eq!(payer.counterparty(), Some(b.id()));
        assert_eq!(payee.counterparty(), Some(a.id()));
        assert_eq!(payer.account_id(), a.id());
        assert_eq!(payee.account_id(), b.id());
        assert_eq!(payer.timestamp(), payee.timestamp());
        assert_eq!(payer.tx_type(), TransactionType::Pay);
        assert_eq!(payer.flow(), Flow::Outflow);
        assert_eq!(payee.flow(), Flow::Inflow);
        assert_eq!(payer.current_balance(), units(800));
        assert_eq!(payee.current_balance(), units(700));
        assert_eq!(a.ledger().len(), 1);
        assert_eq!(b.ledger().len(), 1);
    }

    #[test]
    fn test_payment_declined_by_payer_policy() {
        let mut a = Account::with_policy("A", units(100), no_overdraft());
        let mut b = Account::new("B", units(500));

        let (payer, payee) = a.payment(&mut b, units(150));

        assert_eq!(payer.status(), TransactionStatus::Declined);
        assert_eq!(payee.status(), TransactionStatus::Declined);
        assert_eq!(a.balance(), units(100));
        assert_eq!(b.balance(), units(500));
        assert_eq!(payer.current_balance(), units(100));
        assert_eq!(payee.current_balance(), units(500));
    }

    #[test]
    fn test_payment_declined_by_payee_policy() {
        let mut a = Account::with_policy("A", units(5000), no_overdraft());
        let mut b = Account::new("B", units(0));

        // 1500 fits A's withdrawal limit but exceeds B's default max deposit
        let (payer, payee) = a.payment(&mut b, units(1500));

        assert_eq!(payer.status(), TransactionStatus::Declined);
        assert_eq!(payee.status(), TransactionStatus::Declined);
        assert_eq!(a.balance(), units(5000));
        assert_eq!(b.balance(), Money::zero());
    }

    #[test]
    fn test_ledger_order_regardless_of_outcome() {
        let mut account = Account::with_policy("A", units(0), no_overdraft());
        let first = account.deposit(units(10));
        let second = account.withdraw(units(50));
        let third = account.deposit(units(20));

        let ids: Vec<_> = account.ledger().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![first.id(), second.id(), third.id()]);
        assert_eq!(second.status(), TransactionStatus::Declined);
        assert_eq!(account.balance(), units(30));
    }

    #[test]
    fn test_balance_matches_ledger_effects() {
        let mut a = Account::new("A", units(250));
        let mut b = Account::new("B", units(40));
        a.deposit(units(700));
        a.withdraw(units(2000));
        a.payment(&mut b, units(900));
        b.withdraw(units(990));
        b.deposit(units(-3));

        assert_eq!(a.opening_balance(), units(250));
        assert_eq!(b.opening_balance(), units(40));
        assert_eq!(a.balance(), units(250) + a.ledger().net_effect());
        assert_eq!(b.balance(), units(40) + b.ledger().net_effect());
    }

    #[test]
    fn test_restore_keeps_identity() {
        let original = Account::new("A", units(10));
        let restored = Account::restore(
            original.id(),
            "A",
            units(10),
            Policy::default(),
            Ledger::new(),
        );
        assert_eq!(restored.id(), original.id());
        assert_eq!(restored.to_string(), format!("A ({}): 10", original.id()));
    }
}
