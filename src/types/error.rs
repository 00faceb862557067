//! Error types for the ledger engine
//!
//! This module defines every error the transfer core, the storage adapters and
//! the replay pipeline can surface.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: account, entry or transfer row does not exist
//! - **Storage Errors**: a write, commit or rollback was rejected by the store
//! - **Context Errors**: the caller's deadline expired or the call was cancelled
//! - **Validation Errors**: caller-side checks done before a transfer is attempted

use super::account::AccountId;
use super::ledger::{EntryId, TransferId};
use thiserror::Error;

/// Main error type for the ledger engine
///
/// The transfer core surfaces storage failures verbatim. The only error it
/// builds itself is [`LedgerError::Rollback`], which carries both the original
/// failure and the rollback failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Account row does not exist
    #[error("Account {id} not found")]
    AccountNotFound { id: AccountId },

    /// Entry row does not exist
    #[error("Entry {id} not found")]
    EntryNotFound { id: EntryId },

    /// Transfer row does not exist
    #[error("Transfer {id} not found")]
    TransferNotFound { id: TransferId },

    /// Applying a delta would overflow the balance column
    #[error("Balance overflow on account {account_id}")]
    BalanceOverflow { account_id: AccountId },

    /// A storage operation was rejected
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Commit was rejected; the transaction must be treated as not applied
    #[error("Commit failed: {message}")]
    Commit { message: String },

    /// The unit of work failed and so did the rollback that followed it
    ///
    /// Data consistency cannot be assumed after this error.
    #[error("tx err: {error}, rb err: {rollback_error}")]
    Rollback {
        error: Box<LedgerError>,
        rollback_error: Box<LedgerError>,
    },

    /// The caller cancelled the operation while it was waiting on storage
    #[error("{operation} cancelled")]
    Cancelled { operation: String },

    /// The caller's deadline expired while waiting on storage
    #[error("{operation} exceeded its deadline")]
    DeadlineExceeded { operation: String },

    /// Transfer amount must be positive, opening balance non-negative
    #[error("Invalid amount {amount}")]
    InvalidAmount { amount: i64 },

    #[error("Unsupported currency '{currency}'")]
    UnsupportedCurrency { currency: String },

    #[error("account [{account_id}] currency mismatch: {actual} vs {expected}")]
    CurrencyMismatch {
        account_id: AccountId,
        expected: String,
        actual: String,
    },

    #[error("Cannot transfer from account {account_id} to itself")]
    SameAccount { account_id: AccountId },
}

impl LedgerError {
    pub fn account_not_found(id: AccountId) -> Self {
        LedgerError::AccountNotFound { id }
    }

    pub fn entry_not_found(id: EntryId) -> Self {
        LedgerError::EntryNotFound { id }
    }

    pub fn transfer_not_found(id: TransferId) -> Self {
        LedgerError::TransferNotFound { id }
    }

    pub fn balance_overflow(account_id: AccountId) -> Self {
        LedgerError::BalanceOverflow { account_id }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }

    pub fn commit(message: impl Into<String>) -> Self {
        LedgerError::Commit {
            message: message.into(),
        }
    }

    /// Combine a unit-of-work failure with the rollback failure it triggered
    pub fn rollback(error: LedgerError, rollback_error: LedgerError) -> Self {
        LedgerError::Rollback {
            error: Box::new(error),
            rollback_error: Box::new(rollback_error),
        }
    }

    pub fn cancelled(operation: &str) -> Self {
        LedgerError::Cancelled {
            operation: operation.to_string(),
        }
    }

    pub fn deadline_exceeded(operation: &str) -> Self {
        LedgerError::DeadlineExceeded {
            operation: operation.to_string(),
        }
    }

    pub fn invalid_amount(amount: i64) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    pub fn unsupported_currency(currency: &str) -> Self {
        LedgerError::UnsupportedCurrency {
            currency: currency.to_string(),
        }
    }

    pub fn currency_mismatch(account_id: AccountId, expected: &str, actual: &str) -> Self {
        LedgerError::CurrencyMismatch {
            account_id,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn same_account(account_id: AccountId) -> Self {
        LedgerError::SameAccount { account_id }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for LedgerError {
    fn from(error: sqlx::Error) -> Self {
        LedgerError::Storage {
            message: error.to_string(),
        }
    }
}
