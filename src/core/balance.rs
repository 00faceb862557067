//! Balance updater and canonical lock ordering
//!
//! Two transfers over the same pair of accounts in opposite directions would,
//! if each locked its source row first, take the two row locks in opposite
//! order and deadlock. Every balance change made by a transfer therefore goes
//! through [`add_money`] with its two deltas in canonical order: the account
//! with the smaller id is always updated first, whichever side of the transfer
//! it is on.
//!
//! Each update is one atomic add-to-balance against storage. The row lock it
//! takes is held until the enclosing transaction ends, so any two transfers
//! touching the same pair acquire their locks in the same total order.

use super::context::TxContext;
use super::traits::Mutator;
use crate::types::{Account, AccountId, AddAccountBalanceParams, LedgerError};

/// A signed change to apply to one account's balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account_id: AccountId,
    pub amount: i64,
}

impl BalanceDelta {
    pub fn new(account_id: AccountId, amount: i64) -> Self {
        Self { account_id, amount }
    }
}

/// Two deltas sorted into lock order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedDeltas {
    pub first: BalanceDelta,
    pub second: BalanceDelta,
    /// True when `first` is the second argument passed to [`OrderedDeltas::new`]
    pub swapped: bool,
}

impl OrderedDeltas {
    /// Order `(a, b)` so the smaller account id comes first
    ///
    /// Ties keep `b` first, matching the transfer path where the source is only
    /// updated first when its id is strictly smaller.
    pub fn new(a: BalanceDelta, b: BalanceDelta) -> Self {
        if a.account_id < b.account_id {
            Self {
                first: a,
                second: b,
                swapped: false,
            }
        } else {
            Self {
                first: b,
                second: a,
                swapped: true,
            }
        }
    }

    /// Map `(first, second)` results back onto the original `(a, b)` argument order
    pub fn unorder<T>(&self, first: T, second: T) -> (T, T) {
        if self.swapped {
            (second, first)
        } else {
            (first, second)
        }
    }
}

/// Apply two already-ordered deltas and return both updated accounts
///
/// Results come back in application order: `(first, second)`. Either update
/// failing aborts the pair; the caller's transaction is expected to roll back.
pub async fn add_money<M>(
    tx: &mut M,
    ctx: &TxContext,
    first: BalanceDelta,
    second: BalanceDelta,
) -> Result<(Account, Account), LedgerError>
where
    M: Mutator + ?Sized,
{
    let first_account = tx
        .add_account_balance(
            ctx,
            AddAccountBalanceParams {
                id: first.account_id,
                amount: first.amount,
            },
        )
        .await?;

    let second_account = tx
        .add_account_balance(
            ctx,
            AddAccountBalanceParams {
                id: second.account_id,
                amount: second.amount,
            },
        )
        .await?;

    Ok((first_account, second_account))
}

/// Apply a debit and a credit in canonical order, returning `(debited, credited)`
pub async fn apply_ordered<M>(
    tx: &mut M,
    ctx: &TxContext,
    debit: BalanceDelta,
    credit: BalanceDelta,
) -> Result<(Account, Account), LedgerError>
where
    M: Mutator + ?Sized,
{
    let ordered = OrderedDeltas::new(debit, credit);
    let (first, second) = add_money(tx, ctx, ordered.first, ordered.second).await?;
    Ok(ordered.unorder(first, second))
}
