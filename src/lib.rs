//! policy-ledger - policy-governed multi-account ledger
//!
//! Accounts hold an integer balance and a [`models::Policy`] that decides
//! whether each deposit, withdrawal or payment is allowed. Every attempt,
//! accepted or declined, is recorded in an append-only ledger.
//!
//! # Architecture
//!
//! - `models`: the account state machine, policies, transactions, ledger
//! - `storage`: JSON file repositories and the persistence gateway
//! - `services`: per-account locking, the transaction engine, account,
//!   policy and username management
//! - `audit`: JSONL audit log of entity changes
//! - `config`: path resolution and user settings
//! - `display` / `export`: terminal formatting and CSV/JSON/YAML export
//! - `cli`: clap command handlers for the `ledger` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_ledger::config::LedgerPaths;
//! use policy_ledger::models::{Money, Policy};
//! use policy_ledger::services::{AccountLocks, AccountService, TransactionService};
//! use policy_ledger::storage::Storage;
//!
//! let storage = Storage::open(LedgerPaths::new()?)?;
//! let alice = AccountService::new(&storage).create("Alice", Money::from_units(100), &Policy::default())?;
//! let locks = AccountLocks::new();
//! let tx = TransactionService::new(&storage, &locks).deposit(alice.id, Money::from_units(50))?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{LedgerError, LedgerResult};
