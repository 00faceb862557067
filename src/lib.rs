//! Rust Ledger Engine Library
//!
//! # Overview
//!
//! A double-entry money-transfer core over a transactional store with
//! row-level locking, plus a CSV replay pipeline that drives it with either a
//! sequential or a concurrent batch strategy.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, entries, transfers, replay records and errors
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Transfer and account-opening orchestration
//!   - [`core::executor`] - Commit-or-rollback transactional executor
//!   - [`core::balance`] - Balance updates in canonical lock order
//!   - [`core::processor`] - Caller-side validation of replay records
//! - [`storage`] - In-memory and PostgreSQL (feature `postgres`) adapters
//! - [`io`] - CSV reading and account output
//! - [`strategy`] - Sync and async replay pipelines
//! - [`cli`] / [`logging`] - Binary configuration
//!
//! # Transfers
//!
//! A transfer of `amount` from A to B writes, in one transaction:
//!
//! - one transfer row `{A, B, amount}`
//! - an entry of `-amount` on A and an entry of `+amount` on B
//! - two atomic balance updates, always applied to the smaller account id
//!   first, so opposite-direction transfers over the same pair cannot deadlock
//!
//! Any failure rolls the whole transfer back. Every account's balance equals
//! the sum of its entries.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod storage;
pub mod strategy;
pub mod types;

pub use core::{LedgerEngine, RecordProcessor, TxContext};
pub use io::write_accounts_csv;
pub use storage::MemoryStore;
pub use types::{
    Account, AccountId, Entry, LedgerError, LedgerRecord, Transfer, TransferTxParams,
    TransferTxResult,
};
