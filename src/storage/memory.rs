//! In-process transactional store
//!
//! This module provides `MemoryStore`, a storage adapter that behaves like a
//! relational engine with row-level locking, without needing a database.
//!
//! # Design
//!
//! - Committed rows live in `DashMap`s and are what [`Querier`] reads see.
//! - Every account row owns an exclusive row lock (`tokio::sync::Mutex`). A
//!   transaction takes it on its first balance update or `get_account_for_update`
//!   and keeps it until commit, rollback or drop.
//! - Writes are buffered in the transaction and published on commit, before the
//!   row locks are released. A later transaction that locks the same row always
//!   sees the earlier one's balance.
//! - Publication holds the write half of a store-wide `RwLock` and every
//!   [`Querier`] read holds the read half, so a reader sees all of a commit's
//!   rows or none of them.
//! - Ids come from per-table sequences; ids handed out to a transaction that
//!   rolls back are not reused.
//!
//! Lock waits without a deadline wait forever, exactly like a database with no
//! deadlock detector: taking two rows in opposite order from two transactions
//! really does hang.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{trace, warn};

use crate::core::context::TxContext;
use crate::core::traits::{Mutator, Querier, Transaction, TransactionalStore};
use crate::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, EntryId, LedgerError, PageParams, Transfer, TransferId,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: DashMap<AccountId, Account>,
    row_locks: DashMap<AccountId, Arc<Mutex<()>>>,
    /// Held for writing while a commit publishes its rows
    publish: RwLock<()>,
    entries: DashMap<EntryId, Entry>,
    transfers: DashMap<TransferId, Transfer>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// Thread-safe in-memory ledger storage
///
/// Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Querier for MemoryStore {
    async fn get_account(&self, _ctx: &TxContext, id: AccountId) -> Result<Account, LedgerError> {
        let _published = self.tables.publish.read().await;
        self.tables
            .accounts
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    async fn get_entry(&self, _ctx: &TxContext, id: EntryId) -> Result<Entry, LedgerError> {
        let _published = self.tables.publish.read().await;
        self.tables
            .entries
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| LedgerError::entry_not_found(id))
    }

    async fn get_transfer(
        &self,
        _ctx: &TxContext,
        id: TransferId,
    ) -> Result<Transfer, LedgerError> {
        let _published = self.tables.publish.read().await;
        self.tables
            .transfers
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| LedgerError::transfer_not_found(id))
    }

    async fn list_accounts(
        &self,
        _ctx: &TxContext,
        page: PageParams,
    ) -> Result<Vec<Account>, LedgerError> {
        let _published = self.tables.publish.read().await;
        let mut accounts: Vec<Account> = self
            .tables
            .accounts
            .iter()
            .map(|row| row.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(page.window(accounts.into_iter()))
    }

    async fn list_entries(
        &self,
        _ctx: &TxContext,
        account_id: AccountId,
        page: PageParams,
    ) -> Result<Vec<Entry>, LedgerError> {
        let _published = self.tables.publish.read().await;
        let mut entries: Vec<Entry> = self
            .tables
            .entries
            .iter()
            .filter(|row| row.value().account_id == account_id)
            .map(|row| row.value().clone())
            .collect();
        entries.sort_by_key(|entry| entry.id);
        Ok(page.window(entries.into_iter()))
    }

    async fn list_transfers(
        &self,
        _ctx: &TxContext,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: PageParams,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let _published = self.tables.publish.read().await;
        let mut transfers: Vec<Transfer> = self
            .tables
            .transfers
            .iter()
            .filter(|row| {
                let transfer = row.value();
                transfer.from_account_id == from_account_id
                    || transfer.to_account_id == to_account_id
            })
            .map(|row| row.value().clone())
            .collect();
        transfers.sort_by_key(|transfer| transfer.id);
        Ok(page.window(transfers.into_iter()))
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self, ctx: &TxContext) -> Result<MemoryTx, LedgerError> {
        ctx.guard("begin", async { Ok(MemoryTx::new(Arc::clone(&self.tables))) })
            .await
    }
}

/// A transaction against [`MemoryStore`]
///
/// Dropping it without commit discards its writes and releases its row locks.
#[derive(Debug)]
pub struct MemoryTx {
    tables: Arc<Tables>,
    row_guards: HashMap<AccountId, OwnedMutexGuard<()>>,
    /// Locked or newly created account rows, as this transaction sees them
    dirty_accounts: HashMap<AccountId, Account>,
    created_accounts: Vec<AccountId>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    finished: bool,
}

impl MemoryTx {
    fn new(tables: Arc<Tables>) -> Self {
        Self {
            tables,
            row_guards: HashMap::new(),
            dirty_accounts: HashMap::new(),
            created_accounts: Vec::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
            finished: false,
        }
    }

    fn account_exists(&self, id: AccountId) -> bool {
        self.dirty_accounts.contains_key(&id) || self.tables.accounts.contains_key(&id)
    }

    fn current_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        if let Some(account) = self.dirty_accounts.get(&id) {
            return Ok(account.clone());
        }
        self.tables
            .accounts
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Take the exclusive row lock for `id` unless this transaction already holds it
    async fn lock_row(&mut self, ctx: &TxContext, id: AccountId) -> Result<(), LedgerError> {
        if self.row_guards.contains_key(&id) || self.created_accounts.contains(&id) {
            return Ok(());
        }

        let lock = self
            .tables
            .row_locks
            .get(&id)
            .map(|row| Arc::clone(row.value()))
            .ok_or_else(|| LedgerError::account_not_found(id))?;

        let operation = format!("lock account {}", id);
        let guard = ctx
            .guard(&operation, async move { Ok(lock.lock_owned().await) })
            .await?;
        trace!(parent: ctx.span(), account = id, "row locked");

        self.row_guards.insert(id, guard);
        Ok(())
    }

    fn discard(&mut self) {
        self.dirty_accounts.clear();
        self.created_accounts.clear();
        self.entries.clear();
        self.transfers.clear();
        self.row_guards.clear();
        self.finished = true;
    }
}

#[async_trait]
impl Mutator for MemoryTx {
    async fn create_account(
        &mut self,
        _ctx: &TxContext,
        params: CreateAccountParams,
    ) -> Result<Account, LedgerError> {
        let account = Account {
            id: next_id(&self.tables.account_seq),
            owner_name: params.owner_name,
            balance: 0,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.created_accounts.push(account.id);
        self.dirty_accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account_for_update(
        &mut self,
        ctx: &TxContext,
        id: AccountId,
    ) -> Result<Account, LedgerError> {
        self.lock_row(ctx, id).await?;
        self.current_account(id)
    }

    async fn create_transfer(
        &mut self,
        _ctx: &TxContext,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError> {
        if params.amount <= 0 {
            return Err(LedgerError::storage(format!(
                "transfer amount must be positive, got {}",
                params.amount
            )));
        }
        for id in [params.from_account_id, params.to_account_id] {
            if !self.account_exists(id) {
                return Err(LedgerError::account_not_found(id));
            }
        }

        let transfer = Transfer {
            id: next_id(&self.tables.transfer_seq),
            from_account_id: params.from_account_id,
            to_account_id: params.to_account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn create_entry(
        &mut self,
        _ctx: &TxContext,
        params: CreateEntryParams,
    ) -> Result<Entry, LedgerError> {
        if !self.account_exists(params.account_id) {
            return Err(LedgerError::account_not_found(params.account_id));
        }

        let entry = Entry {
            id: next_id(&self.tables.entry_seq),
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn add_account_balance(
        &mut self,
        ctx: &TxContext,
        params: AddAccountBalanceParams,
    ) -> Result<Account, LedgerError> {
        self.lock_row(ctx, params.id).await?;

        let mut account = self.current_account(params.id)?;
        account.balance = account
            .balance
            .checked_add(params.amount)
            .ok_or_else(|| LedgerError::balance_overflow(params.id))?;

        self.dirty_accounts.insert(params.id, account.clone());
        Ok(account)
    }
}

#[async_trait]
impl Transaction for MemoryTx {
    async fn commit(mut self) -> Result<(), LedgerError> {
        let tables = Arc::clone(&self.tables);
        let published = tables.publish.write().await;

        // Row locks for new accounts must exist before the rows become visible
        for id in std::mem::take(&mut self.created_accounts) {
            tables.row_locks.insert(id, Arc::new(Mutex::new(())));
        }
        for (id, account) in std::mem::take(&mut self.dirty_accounts) {
            tables.accounts.insert(id, account);
        }
        for transfer in std::mem::take(&mut self.transfers) {
            tables.transfers.insert(transfer.id, transfer);
        }
        for entry in std::mem::take(&mut self.entries) {
            tables.entries.insert(entry.id, entry);
        }
        drop(published);

        // Releases the row locks
        self.discard();
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), LedgerError> {
        self.discard();
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                locked_rows = self.row_guards.len(),
                "transaction dropped before commit, rolling back"
            );
        }
    }
}
