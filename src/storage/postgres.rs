//! PostgreSQL storage adapter
//!
//! Relies on the engine for isolation and row locking:
//!
//! - `add_account_balance` is a single `UPDATE ... SET balance = balance + $1`,
//!   which takes the row lock and holds it until the transaction ends
//! - `get_account_for_update` uses `SELECT ... FOR NO KEY UPDATE`, which does not
//!   conflict with the key-share locks taken by foreign keys on entry inserts
//!
//! Every query is wrapped in [`TxContext::guard`]; a query abandoned on deadline
//! or cancellation drops its connection, and the open transaction rolls back.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;

use crate::core::context::TxContext;
use crate::core::traits::{Mutator, Querier, Transaction, TransactionalStore};
use crate::types::{
    Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, EntryId, LedgerError, PageParams, Transfer, TransferId,
};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const ACCOUNT_COLUMNS: &str = "id, owner_name, balance, currency, created_at";
const ENTRY_COLUMNS: &str = "id, account_id, amount, created_at";
const TRANSFER_COLUMNS: &str = "id, from_account_id, to_account_id, amount, created_at";

/// Ledger storage backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool of at most `max_connections` to `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables if they do not exist
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Querier for PgStore {
    async fn get_account(&self, ctx: &TxContext, id: AccountId) -> Result<Account, LedgerError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = $1 LIMIT 1", ACCOUNT_COLUMNS);
        ctx.guard("get_account", async {
            sqlx::query_as::<_, Account>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| LedgerError::account_not_found(id))
        })
        .await
    }

    async fn get_entry(&self, ctx: &TxContext, id: EntryId) -> Result<Entry, LedgerError> {
        let sql = format!("SELECT {} FROM entries WHERE id = $1 LIMIT 1", ENTRY_COLUMNS);
        ctx.guard("get_entry", async {
            sqlx::query_as::<_, Entry>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| LedgerError::entry_not_found(id))
        })
        .await
    }

    async fn get_transfer(
        &self,
        ctx: &TxContext,
        id: TransferId,
    ) -> Result<Transfer, LedgerError> {
        let sql = format!("SELECT {} FROM transfers WHERE id = $1 LIMIT 1", TRANSFER_COLUMNS);
        ctx.guard("get_transfer", async {
            sqlx::query_as::<_, Transfer>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| LedgerError::transfer_not_found(id))
        })
        .await
    }

    async fn list_accounts(
        &self,
        ctx: &TxContext,
        page: PageParams,
    ) -> Result<Vec<Account>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM accounts ORDER BY id LIMIT $1 OFFSET $2",
            ACCOUNT_COLUMNS
        );
        ctx.guard("list_accounts", async {
            Ok(sqlx::query_as::<_, Account>(&sql)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    async fn list_entries(
        &self,
        ctx: &TxContext,
        account_id: AccountId,
        page: PageParams,
    ) -> Result<Vec<Entry>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM entries WHERE account_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            ENTRY_COLUMNS
        );
        ctx.guard("list_entries", async {
            Ok(sqlx::query_as::<_, Entry>(&sql)
                .bind(account_id)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }

    async fn list_transfers(
        &self,
        ctx: &TxContext,
        from_account_id: AccountId,
        to_account_id: AccountId,
        page: PageParams,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM transfers WHERE from_account_id = $1 OR to_account_id = $2 \
             ORDER BY id LIMIT $3 OFFSET $4",
            TRANSFER_COLUMNS
        );
        ctx.guard("list_transfers", async {
            Ok(sqlx::query_as::<_, Transfer>(&sql)
                .bind(from_account_id)
                .bind(to_account_id)
                .bind(page.limit)
                .bind(page.offset)
                .fetch_all(&self.pool)
                .await?)
        })
        .await
    }
}

#[async_trait]
impl TransactionalStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self, ctx: &TxContext) -> Result<PgTx, LedgerError> {
        ctx.guard("begin", async {
            let tx = self.pool.begin().await?;
            Ok(PgTx { tx })
        })
        .await
    }
}

/// An open PostgreSQL transaction
///
/// sqlx rolls the transaction back when this is dropped without commit.
#[derive(Debug)]
pub struct PgTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Mutator for PgTx {
    async fn create_account(
        &mut self,
        ctx: &TxContext,
        params: CreateAccountParams,
    ) -> Result<Account, LedgerError> {
        let sql = format!(
            "INSERT INTO accounts (owner_name, balance, currency) VALUES ($1, 0, $2) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        ctx.guard("create_account", async {
            Ok(sqlx::query_as::<_, Account>(&sql)
                .bind(&params.owner_name)
                .bind(&params.currency)
                .fetch_one(&mut *self.tx)
                .await?)
        })
        .await
    }

    async fn get_account_for_update(
        &mut self,
        ctx: &TxContext,
        id: AccountId,
    ) -> Result<Account, LedgerError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE id = $1 LIMIT 1 FOR NO KEY UPDATE",
            ACCOUNT_COLUMNS
        );
        ctx.guard("get_account_for_update", async {
            sqlx::query_as::<_, Account>(&sql)
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?
                .ok_or_else(|| LedgerError::account_not_found(id))
        })
        .await
    }

    async fn create_transfer(
        &mut self,
        ctx: &TxContext,
        params: CreateTransferParams,
    ) -> Result<Transfer, LedgerError> {
        let sql = format!(
            "INSERT INTO transfers (from_account_id, to_account_id, amount) VALUES ($1, $2, $3) \
             RETURNING {}",
            TRANSFER_COLUMNS
        );
        ctx.guard("create_transfer", async {
            Ok(sqlx::query_as::<_, Transfer>(&sql)
                .bind(params.from_account_id)
                .bind(params.to_account_id)
                .bind(params.amount)
                .fetch_one(&mut *self.tx)
                .await?)
        })
        .await
    }

    async fn create_entry(
        &mut self,
        ctx: &TxContext,
        params: CreateEntryParams,
    ) -> Result<Entry, LedgerError> {
        let sql = format!(
            "INSERT INTO entries (account_id, amount) VALUES ($1, $2) RETURNING {}",
            ENTRY_COLUMNS
        );
        ctx.guard("create_entry", async {
            Ok(sqlx::query_as::<_, Entry>(&sql)
                .bind(params.account_id)
                .bind(params.amount)
                .fetch_one(&mut *self.tx)
                .await?)
        })
        .await
    }

    async fn add_account_balance(
        &mut self,
        ctx: &TxContext,
        params: AddAccountBalanceParams,
    ) -> Result<Account, LedgerError> {
        let sql = format!(
            "UPDATE accounts SET balance = balance + $1 WHERE id = $2 RETURNING {}",
            ACCOUNT_COLUMNS
        );
        ctx.guard("add_account_balance", async {
            sqlx::query_as::<_, Account>(&sql)
                .bind(params.amount)
                .bind(params.id)
                .fetch_optional(&mut *self.tx)
                .await?
                .ok_or_else(|| LedgerError::account_not_found(params.id))
        })
        .await
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(self) -> Result<(), LedgerError> {
        self.tx
            .commit()
            .await
            .map_err(|e| LedgerError::commit(e.to_string()))
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
