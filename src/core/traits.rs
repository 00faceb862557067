//! Storage capability traits consumed by the transfer core
//!
//! Storage is split into two explicit capabilities that an adapter composes:
//!
//! - [`Querier`]: read-only lookups against committed state
//! - [`Mutator`]: single-row writes that only exist inside a transaction
//!
//! [`TransactionalStore`] hands out [`Transaction`] handles, and a transaction is
//! the only thing that can mutate. The core never reads balances into memory to
//! write them back; all balance changes go through
//! [`Mutator::add_account_balance`], which must take an exclusive row lock that is
//! held until the transaction ends.

use super::context::TxContext;
use crate::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, EntryId, LedgerError, PageParams, Transfer, TransferId,
};
use async_trait::async_trait;

/// Read-only query capability
///
/// Lists are ordered by id ascending.
#[async_trait]
pub trait Querier: Send + Sync {
    async fn get_account(&self, ctx: &TxContext, id: AccountId) -> Result<Account, LedgerError>;

    async fn get_entry(&self, ctx: &TxContext, id: EntryId) -> Result<Entry, LedgerError>;

    async fn get_transfer(&self, ctx: &TxContext, id: TransferId)
        -> Result<Transfer, LedgerError>;

    async fn list_accounts(
        &self,
        ctx: &TxContext,
        page: PageParams,
    ) -> Result<Vec<Account>, LedgerError>;

    async fn list_entries(
        &self,
        ctx: &TxContext,
        account_id: AccountId,
        page: PageParams,
    ) -> Result<Vec<Entry>, LedgerError>;

    /// Transfers leaving `from_account_id` or arriving at `to_account_id`
    async fn list_transfers(
        &self,
        ctx: &TxContext,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: PageParams,
    ) -> Result<Vec<Transfer>, LedgerError>;
}

/// Transaction-scoped mutation capability
///
/// Nothing written through a `Mutator` is visible outside its transaction until commit.
#[async_trait]
pub trait Mutator: Send {
    /// Insert a new account row with a zero balance
    async fn create_account(
        &mut self,
        ctx: &TxContext,
        params: CreateAccountParams,
    ) -> Result<Account, LedgerError>;

    /// Lock the account row for the rest of the transaction and read it
    async fn get_account_for_update(
        &mut self,
        ctx: &TxContext,
        id: AccountId,
    ) -> Result<Account, LedgerError>;

    async fn create_transfer(
        &mut self,
        ctx: &TxContext,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError>;

    async fn create_entry(
        &mut self,
        ctx: &TxContext,
        params: CreateEntryParams,
    ) -> Result<Entry, LedgerError>;

    /// Atomically add `params.amount` to the balance and return the updated row
    ///
    /// Takes the row lock if this transaction does not hold it yet.
    async fn add_account_balance(
        &mut self,
        ctx: &TxContext,
        params: AddAccountBalanceParams,
    ) -> Result<Account, LedgerError>;
}

/// A transaction handle
///
/// Dropping a handle without calling [`Transaction::commit`] must roll it back.
#[async_trait]
pub trait Transaction: Mutator {
    async fn commit(self) -> Result<(), LedgerError>;

    async fn rollback(self) -> Result<(), LedgerError>;
}

/// A store that can open transactions
#[async_trait]
pub trait TransactionalStore: Querier {
    type Tx: Transaction;

    async fn begin(&self, ctx: &TxContext) -> Result<Self::Tx, LedgerError>;
}
