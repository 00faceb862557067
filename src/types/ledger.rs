//! Entry and transfer types for the ledger
//!
//! Entries are the append-only balance adjustments backing every account
//! balance. A transfer pairs one debit entry with one credit entry.

use super::account::{Account, AccountId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry identifier
pub type EntryId = i64;

/// Transfer identifier
pub type TransferId = i64;

/// A single signed balance adjustment against one account
///
/// Entries are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    /// Signed delta: negative for the source of a transfer, positive for the destination
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// A record of money moved from one account to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Always positive
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntryParams {
    pub account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransferParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
}

/// Input to the money-transfer transaction
///
/// The caller owns the preconditions: `amount > 0`, both accounts exist and
/// share a currency. None of them are re-checked by the transaction itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxParams {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: i64,
}

/// Everything written by one successful transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTxResult {
    pub transfer: Transfer,
    pub from_account: Account,
    pub to_account: Account,
    pub from_entry: Entry,
    pub to_entry: Entry,
}

/// Result of opening an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccountResult {
    pub account: Account,
    /// Present only when the account was opened with a non-zero balance
    pub opening_entry: Option<Entry>,
}

/// Limit/offset window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub limit: i64,
    pub offset: i64,
}

impl PageParams {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Window for a 1-based page number
    pub fn page(page_id: i64, page_size: i64) -> Self {
        Self {
            limit: page_size,
            offset: (page_id.max(1) - 1) * page_size,
        }
    }

    /// Apply the window to an id-ordered iterator
    pub(crate) fn window<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit.max(0)).unwrap_or(usize::MAX);
        items.skip(offset).take(limit).collect()
    }
}
