//! Transaction model
//!
//! One attempted money movement and its outcome. Everything except the
//! status is fixed at construction; the status moves exactly once from
//! PROCESSING to a terminal value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, TransactionId};
use super::money::Money;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Pay,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::Pay => write!(f, "PAY"),
        }
    }
}

/// Direction of a transaction's effect on its own account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Flow {
    Inflow,
    Outflow,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inflow => write!(f, "IN"),
            Self::Outflow => write!(f, "OUT"),
        }
    }
}

/// Outcome of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// Created, outcome not yet decided
    #[default]
    Processing,
    /// Applied to the balance
    Success,
    /// Refused by policy; balance unchanged
    Declined,
    /// Could not be carried out (e.g. persistence failure); balance unchanged
    Failure,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "PROCESSING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Declined => write!(f, "DECLINED"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// A recorded transaction attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    account_id: AccountId,
    amount: Money,
    tx_type: TransactionType,
    flow: Flow,
    /// Account balance after this attempt
    current_balance: Money,
    timestamp: DateTime<Utc>,
    status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    counterparty: Option<AccountId>,
}

impl Transaction {
    /// Create a transaction in the PROCESSING state
    ///
    /// A fresh id is generated when `id` is `None`.
    pub fn new(
        id: Option<TransactionId>,
        account_id: AccountId,
        amount: Money,
        tx_type: TransactionType,
        flow: Flow,
        current_balance: Money,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.unwrap_or_default(),
            account_id,
            amount,
            tx_type,
            flow,
            current_balance,
            timestamp,
            status: TransactionStatus::Processing,
            counterparty: None,
        }
    }

    /// Attach the other side of a two-account movement
    pub fn with_counterparty(mut self, counterparty: AccountId) -> Self {
        self.counterparty = Some(counterparty);
        self
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn current_balance(&self) -> Money {
        self.current_balance
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn counterparty(&self) -> Option<AccountId> {
        self.counterparty
    }

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }

    /// Move from PROCESSING to a terminal status
    pub fn settle(&mut self, status: TransactionStatus) -> Result<(), StatusTransitionError> {
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(StatusTransitionError {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }

    /// Builder form of [`settle`](Self::settle) for a record still inside its
    /// constructing operation
    pub(crate) fn with_outcome(mut self, status: TransactionStatus) -> Self {
        debug_assert!(!self.status.is_terminal() && status.is_terminal());
        self.status = status;
        self
    }

    /// Change this transaction applied to its account's balance
    pub fn signed_effect(&self) -> Money {
        if !self.is_success() {
            return Money::zero();
        }
        match self.flow {
            Flow::Inflow => self.amount,
            Flow::Outflow => -self.amount,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} -> balance {} [{}]",
            self.id, self.tx_type, self.flow, self.amount, self.current_balance, self.status
        )
    }
}

/// A status change other than PROCESSING -> terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransitionError {
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

impl fmt::Display for StatusTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot move transaction from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for StatusTransitionError {}
