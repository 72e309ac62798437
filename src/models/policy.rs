//! Policy model
//!
//! A policy bounds the size of deposits and withdrawals for one account and
//! decides whether its balance may go negative. Validation is a pure function
//! of the policy fields, the requested amount and the current balance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::ids::PolicyId;
use super::money::Money;

/// Per-account transaction rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyFields")]
pub struct Policy {
    max_deposit: Money,
    max_withdrawal: Money,
    /// Stored and hashed, but not enforced by any validation path
    daily_withdrawal_limit: Money,
    allow_negative_balance: bool,
    /// Magnitude of the negative balance allowed when negatives are allowed
    overdraft_limit: Money,
}

/// Unchecked mirror of [`Policy`] used when deserializing
#[derive(Deserialize)]
struct PolicyFields {
    max_deposit: Money,
    max_withdrawal: Money,
    daily_withdrawal_limit: Money,
    allow_negative_balance: bool,
    overdraft_limit: Money,
}

impl TryFrom<PolicyFields> for Policy {
    type Error = PolicyUpdateError;

    fn try_from(f: PolicyFields) -> Result<Self, Self::Error> {
        Policy::new(
            f.max_deposit,
            f.max_withdrawal,
            f.daily_withdrawal_limit,
            f.allow_negative_balance,
            f.overdraft_limit,
        )
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_deposit: Money::from_units(1000),
            max_withdrawal: Money::from_units(1000),
            daily_withdrawal_limit: Money::from_units(10000),
            allow_negative_balance: true,
            overdraft_limit: Money::from_units(50),
        }
    }
}

impl Policy {
    /// Create a policy with custom limits
    ///
    /// Every limit must be non-negative.
    pub fn new(
        max_deposit: Money,
        max_withdrawal: Money,
        daily_withdrawal_limit: Money,
        allow_negative_balance: bool,
        overdraft_limit: Money,
    ) -> Result<Self, PolicyUpdateError> {
        for (field, value) in [
            ("max_deposit", max_deposit),
            ("max_withdrawal", max_withdrawal),
            ("daily_withdrawal_limit", daily_withdrawal_limit),
            ("overdraft_limit", overdraft_limit),
        ] {
            if value.is_negative() {
                return Err(PolicyUpdateError::NegativeLimit {
                    field,
                    value: value.units(),
                });
            }
        }

        Ok(Self {
            max_deposit,
            max_withdrawal,
            daily_withdrawal_limit,
            allow_negative_balance,
            overdraft_limit,
        })
    }

    pub fn max_deposit(&self) -> Money {
        self.max_deposit
    }

    pub fn max_withdrawal(&self) -> Money {
        self.max_withdrawal
    }

    pub fn daily_withdrawal_limit(&self) -> Money {
        self.daily_withdrawal_limit
    }

    pub fn allow_negative_balance(&self) -> bool {
        self.allow_negative_balance
    }

    pub fn overdraft_limit(&self) -> Money {
        self.overdraft_limit
    }

    /// Content hash identifying this set of limits
    pub fn id(&self) -> PolicyId {
        PolicyId::from_fields(
            self.max_deposit.units(),
            self.max_withdrawal.units(),
            self.daily_withdrawal_limit.units(),
            self.allow_negative_balance,
            self.overdraft_limit.units(),
        )
    }

    /// Whether a deposit of `amount` is permitted
    pub fn validate_deposit(&self, amount: Money) -> bool {
        !(amount > self.max_deposit || amount.is_negative())
    }

    /// Whether a withdrawal of `amount` from `balance` is permitted
    ///
    /// With negative balances allowed, only the overdraft floor applies; the
    /// plain "amount exceeds balance" check is skipped. A negative amount is
    /// never a withdrawal, and neither is one whose result would overflow.
    pub fn validate_withdrawal(&self, amount: Money, balance: Money) -> bool {
        if amount > self.max_withdrawal || amount.is_negative() {
            return false;
        }
        if !self.allow_negative_balance && amount > balance {
            return false;
        }
        if self.allow_negative_balance {
            return match balance.checked_sub(amount) {
                Some(after) => after >= -self.overdraft_limit,
                None => false,
            };
        }
        true
    }

    /// Apply a field → value patch
    ///
    /// Recognized keys (snake_case or camelCase) overwrite the matching field;
    /// anything else is ignored. A recognized key with a bad value rejects the
    /// whole patch and leaves the policy untouched.
    pub fn update_policy(&mut self, updates: &Map<String, Value>) -> Result<(), PolicyUpdateError> {
        let mut candidate = self.clone();

        for (key, value) in updates {
            match key.as_str() {
                "max_deposit" | "maxDeposit" => {
                    candidate.max_deposit = limit_value("max_deposit", value)?;
                }
                "max_withdrawal" | "maxWithdrawal" => {
                    candidate.max_withdrawal = limit_value("max_withdrawal", value)?;
                }
                "daily_withdrawal_limit" | "dailyWithdrawalLimit" => {
                    candidate.daily_withdrawal_limit = limit_value("daily_withdrawal_limit", value)?;
                }
                "allow_negative_balance" | "allowNegativeBalance" => {
                    candidate.allow_negative_balance = value.as_bool().ok_or(
                        PolicyUpdateError::WrongType {
                            field: "allow_negative_balance",
                            expected: "boolean",
                        },
                    )?;
                }
                "overdraft_limit" | "overdraftLimit" => {
                    candidate.overdraft_limit = limit_value("overdraft_limit", value)?;
                }
                _ => {}
            }
        }

        *self = candidate;
        Ok(())
    }
}

fn limit_value(field: &'static str, value: &Value) -> Result<Money, PolicyUpdateError> {
    let units = value.as_i64().ok_or(PolicyUpdateError::WrongType {
        field,
        expected: "integer",
    })?;
    if units < 0 {
        return Err(PolicyUpdateError::NegativeLimit { field, value: units });
    }
    Ok(Money::from_units(units))
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deposit <= {}, withdrawal <= {}, daily <= {}, ",
            self.max_deposit, self.max_withdrawal, self.daily_withdrawal_limit
        )?;
        if self.allow_negative_balance {
            write!(f, "overdraft to -{}", self.overdraft_limit)
        } else {
            write!(f, "no overdraft")
        }
    }
}

/// Rejected policy values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyUpdateError {
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    NegativeLimit {
        field: &'static str,
        value: i64,
    },
}

impl fmt::Display for PolicyUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType { field, expected } => {
                write!(f, "Policy field '{}' expects a {}", field, expected)
            }
            Self::NegativeLimit { field, value } => {
                write!(f, "Policy field '{}' must be non-negative, got {}", field, value)
            }
        }
    }
}

impl std::error::Error for PolicyUpdateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn units(n: i64) -> Money {
        Money::from_units(n)
    }

    fn strict() -> Policy {
        Policy::new(units(5000), units(2000), units(10000), false, units(100)).unwrap()
    }

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults() {
        let p = Policy::default();
        assert_eq!(p.max_deposit(), units(1000));
        assert_eq!(p.max_withdrawal(), units(1000));
        assert_eq!(p.daily_withdrawal_limit(), units(10000));
        assert!(p.allow_negative_balance());
        assert_eq!(p.overdraft_limit(), units(50));
    }

    #[test]
    fn test_new_rejects_negative_limits() {
        let err = Policy::new(units(-1), units(0), units(0), false, units(0)).unwrap_err();
        assert_eq!(
            err,
            PolicyUpdateError::NegativeLimit {
                field: "max_deposit",
                value: -1
            }
        );
    }

    #[test]
    fn test_deposit_boundaries() {
        let p = Policy::default();
        assert!(p.validate_deposit(units(1000)));
        assert!(!p.validate_deposit(units(1001)));
        assert!(p.validate_deposit(units(0)));
        assert!(!p.validate_deposit(units(-1)));
    }

    #[test]
    fn test_withdrawal_without_overdraft() {
        let p = strict();
        assert!(p.validate_withdrawal(units(500), units(500)));
        assert!(!p.validate_withdrawal(units(501), units(500)));
        assert!(!p.validate_withdrawal(units(2001), units(10_000)));
    }

    #[test]
    fn test_withdrawal_overdraft_floor() {
        let p = Policy::default();
        assert!(p.validate_withdrawal(units(50), units(0)));
        assert!(!p.validate_withdrawal(units(51), units(0)));
        // amount > balance is fine while the floor holds
        assert!(p.validate_withdrawal(units(120), units(100)));
        assert!(!p.validate_withdrawal(units(1001), units(5000)));
    }

    #[test]
    fn test_negative_withdrawal_rejected() {
        let p = Policy::default();
        assert!(!p.validate_withdrawal(units(-1), units(100)));
        assert!(!p.validate_withdrawal(units(-5000), units(0)));
    }

    #[test]
    fn test_withdrawal_past_i64_min_rejected() {
        let max = units(i64::MAX);
        let p = Policy::new(units(1000), max, units(10000), true, max).unwrap();
        assert!(p.validate_withdrawal(max, units(0)));
        assert!(!p.validate_withdrawal(max, units(-2)));
    }

    #[test]
    fn test_update_known_keys_in_both_spellings() {
        let mut p = Policy::default();
        p.update_policy(&patch(json!({
            "maxDeposit": 5000,
            "max_withdrawal": 300,
            "allowNegativeBalance": false,
        })))
        .unwrap();

        assert_eq!(p.max_deposit(), units(5000));
        assert_eq!(p.max_withdrawal(), units(300));
        assert!(!p.allow_negative_balance());
        assert_eq!(p.overdraft_limit(), units(50));
    }

    #[test]
    fn test_update_ignores_unknown_keys() {
        let mut p = Policy::default();
        p.update_policy(&patch(json!({"favouriteColour": "green", "overdraft_limit": 75})))
            .unwrap();
        assert_eq!(p.overdraft_limit(), units(75));
    }

    #[test]
    fn test_bad_value_leaves_policy_untouched() {
        let mut p = Policy::default();
        let err = p
            .update_policy(&patch(json!({"max_deposit": 10, "overdraft_limit": -5})))
            .unwrap_err();

        assert!(matches!(err, PolicyUpdateError::NegativeLimit { field: "overdraft_limit", .. }));
        assert_eq!(p, Policy::default());

        let err = p
            .update_policy(&patch(json!({"allow_negative_balance": "yes"})))
            .unwrap_err();
        assert!(matches!(err, PolicyUpdateError::WrongType { .. }));
    }

    #[test]
    fn test_id_tracks_content() {
        let mut p = Policy::default();
        let before = p.id();
        assert_eq!(before, Policy::default().id());

        p.update_policy(&patch(json!({"dailyWithdrawalLimit": 1}))).unwrap();
        assert_ne!(before, p.id());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Policy = serde_json::from_value(json!({
            "max_deposit": 1, "max_withdrawal": 2, "daily_withdrawal_limit": 3,
            "allow_negative_balance": true, "overdraft_limit": 4
        }))
        .unwrap();
        assert_eq!(ok.overdraft_limit(), units(4));

        let bad = serde_json::from_value::<Policy>(json!({
            "max_deposit": -1, "max_withdrawal": 2, "daily_withdrawal_limit": 3,
            "allow_negative_balance": true, "overdraft_limit": 4
        }));
        assert!(bad.is_err());
    }
}
