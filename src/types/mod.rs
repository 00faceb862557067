//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account rows and balance parameters
//! - `ledger`: Entries, transfers and the transfer result bundle
//! - `error`: Error types for the ledger engine
//! - `record`: Parsed replay records

pub mod account;
pub mod error;
pub mod ledger;
pub mod record;

pub use account::{
    is_supported_currency, Account, AccountId, AddAccountBalanceParams, CreateAccountParams,
    OpenAccountParams, SUPPORTED_CURRENCIES,
};
pub use error::LedgerError;
pub use ledger::{
    CreateEntryParams, CreateTransferParams, Entry, EntryId, OpenAccountResult, PageParams,
    Transfer, TransferId, TransferTxParams, TransferTxResult,
};
pub use record::LedgerRecord;
