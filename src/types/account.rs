//! Account-related types for the ledger
//!
//! This module defines the Account row and the parameter structs used to
//! create accounts and mutate their balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier, assigned by storage
pub type AccountId = i64;

/// A ledger account
///
/// The balance is a signed amount in minor currency units. It must always equal
/// the sum of all entries recorded against the account, and it is only ever
/// changed through an atomic add-to-balance inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Account {
    /// Unique account id
    pub id: AccountId,

    /// Name of the account holder
    pub owner_name: String,

    /// Current balance in minor units (may be negative, no overdraft policy)
    pub balance: i64,

    /// ISO currency code, fixed at creation
    pub currency: String,

    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting a new account row
///
/// New rows always start at a zero balance; a non-zero opening balance is
/// recorded as an entry by [`OpenAccountParams`] handling in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountParams {
    pub owner_name: String,
    pub currency: String,
}

/// Parameters for opening an account with an optional opening balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAccountParams {
    pub owner_name: String,
    pub currency: String,
    /// Opening balance in minor units, recorded as a single entry when non-zero
    pub balance: i64,
}

/// Parameters for the atomic add-to-balance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAccountBalanceParams {
    pub id: AccountId,
    /// Signed delta applied to the current balance
    pub amount: i64,
}

/// Currencies accepted when opening accounts and making transfers
pub const SUPPORTED_CURRENCIES: [&str; 2] = ["USD", "EUR"];

/// Check whether a currency code is accepted by the ledger
pub fn is_supported_currency(currency: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&currency)
}
