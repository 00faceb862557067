//! Transfer orchestration
//!
//! This module provides the `LedgerEngine` struct, the public entry point of the
//! transfer core. It composes storage calls inside the transactional executor
//! and delegates balance changes to the balance updater.
//!
//! # Architecture
//!
//! ```text
//! LedgerEngine
//!     └── Arc<S: TransactionalStore>
//!           ├── Querier        (read-only lookups, exposed via `store()`)
//!           └── begin() -> Tx  (Mutator + commit/rollback)
//! ```
//!
//! # Thread Safety
//!
//! The engine is cheap to clone and is meant to be shared across tasks. It
//! holds no state of its own; every call reads and writes fresh rows inside
//! its own transaction.

use std::sync::Arc;

use tracing::{debug, Instrument};

use super::balance::{apply_ordered, BalanceDelta};
use super::context::TxContext;
use super::executor::run_in_transaction;
use super::traits::{Mutator, TransactionalStore};
use crate::types::{
    AddAccountBalanceParams, CreateAccountParams, CreateEntryParams, CreateTransferParams,
    LedgerError, OpenAccountParams, OpenAccountResult, TransferTxParams, TransferTxResult,
};

/// Transfer orchestrator over a transactional store
#[derive(Debug)]
pub struct LedgerEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TransactionalStore> LedgerEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store, for read-only lookups
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Move `amount` from one account to another in a single transaction
    ///
    /// Writes one transfer row, a `-amount` entry for the source, a `+amount`
    /// entry for the destination, and applies both balance changes in canonical
    /// lock order. Any failure rolls everything back and the first error is
    /// returned unchanged.
    ///
    /// The caller owns validation: `amount > 0`, both accounts exist, matching
    /// currencies. There is no overdraft check and no deduplication; two
    /// identical calls move the money twice.
    pub async fn transfer_tx(
        &self,
        ctx: &TxContext,
        params: TransferTxParams,
    ) -> Result<TransferTxResult, LedgerError> {
        run_in_transaction(self.store.as_ref(), ctx, move |tx, ctx| {
            Box::pin(
                async move {
                    debug!("create transfer");
                    let transfer = tx
                        .create_transfer(
                            ctx,
                            CreateTransferParams {
                                from_account_id: params.from_account_id,
                                to_account_id: params.to_account_id,
                                amount: params.amount,
                            },
                        )
                        .await?;

                    debug!("create entry 1");
                    let from_entry = tx
                        .create_entry(
                            ctx,
                            CreateEntryParams {
                                account_id: params.from_account_id,
                                amount: -params.amount,
                            },
                        )
                        .await?;

                    debug!("create entry 2");
                    let to_entry = tx
                        .create_entry(
                            ctx,
                            CreateEntryParams {
                                account_id: params.to_account_id,
                                amount: params.amount,
                            },
                        )
                        .await?;

                    debug!(
                        first = params.from_account_id.min(params.to_account_id),
                        "update balances"
                    );
                    let (from_account, to_account) = apply_ordered(
                        tx,
                        ctx,
                        BalanceDelta::new(params.from_account_id, -params.amount),
                        BalanceDelta::new(params.to_account_id, params.amount),
                    )
                    .await?;

                    Ok(TransferTxResult {
                        transfer,
                        from_account,
                        to_account,
                        from_entry,
                        to_entry,
                    })
                }
                .instrument(ctx.span().clone()),
            )
        })
        .await
    }

    /// Create an account, recording a non-zero opening balance as one entry
    pub async fn open_account(
        &self,
        ctx: &TxContext,
        params: OpenAccountParams,
    ) -> Result<OpenAccountResult, LedgerError> {
        run_in_transaction(self.store.as_ref(), ctx, move |tx, ctx| {
            Box::pin(
                async move {
                    let account = tx
                        .create_account(
                            ctx,
                            CreateAccountParams {
                                owner_name: params.owner_name,
                                currency: params.currency,
                            },
                        )
                        .await?;
                    debug!(account = account.id, "create account");

                    if params.balance == 0 {
                        return Ok(OpenAccountResult {
                            account,
                            opening_entry: None,
                        });
                    }

                    let entry = tx
                        .create_entry(
                            ctx,
                            CreateEntryParams {
                                account_id: account.id,
                                amount: params.balance,
                            },
                        )
                        .await?;
                    let account = tx
                        .add_account_balance(
                            ctx,
                            AddAccountBalanceParams {
                                id: account.id,
                                amount: params.balance,
                            },
                        )
                        .await?;

                    Ok(OpenAccountResult {
                        account,
                        opening_entry: Some(entry),
                    })
                }
                .instrument(ctx.span().clone()),
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::Querier;
    use crate::storage::MemoryStore;
    use crate::types::{Account, PageParams};

    fn engine() -> LedgerEngine<MemoryStore> {
        LedgerEngine::new(Arc::new(MemoryStore::new()))
    }

    async fn open(engine: &LedgerEngine<MemoryStore>, owner: &str, balance: i64) -> Account {
        engine
            .open_account(
                &TxContext::background(),
                OpenAccountParams {
                    owner_name: owner.to_string(),
                    currency: "USD".to_string(),
                    balance,
                },
            )
            .await
            .unwrap()
            .account
    }

    #[test]
    fn test_engine_is_cloneable_and_shares_store() {
        let store = Arc::new(MemoryStore::new());
        let engine = LedgerEngine::new(Arc::clone(&store));

        let _clone = engine.clone();

        assert!(Arc::strong_count(&store) >= 3);
    }

    #[tokio::test]
    async fn test_open_account_with_zero_balance_writes_no_entry() {
        let engine = engine();
        let ctx = TxContext::background();

        let result = engine
            .open_account(
                &ctx,
                OpenAccountParams {
                    owner_name: "alice".to_string(),
                    currency: "EUR".to_string(),
                    balance: 0,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.account.balance, 0);
        assert_eq!(result.account.currency, "EUR");
        assert!(result.opening_entry.is_none());
        let entries = engine
            .store()
            .list_entries(&ctx, result.account.id, PageParams::new(10, 0))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_open_account_records_opening_entry() {
        let engine = engine();
        let ctx = TxContext::background();

        let result = engine
            .open_account(
                &ctx,
                OpenAccountParams {
                    owner_name: "bob".to_string(),
                    currency: "USD".to_string(),
                    balance: 250,
                },
            )
            .await
            .unwrap();

        let entry = result.opening_entry.unwrap();
        assert_eq!(entry.account_id, result.account.id);
        assert_eq!(entry.amount, 250);
        assert_eq!(result.account.balance, 250);

        let stored = engine.store().get_account(&ctx, result.account.id).await.unwrap();
        assert_eq!(stored.balance, 250);
    }

    #[tokio::test]
    async fn test_transfer_tx_moves_money_and_writes_rows() {
        let engine = engine();
        let ctx = TxContext::new("tx 1");
        let a = open(&engine, "a", 100).await;
        let b = open(&engine, "b", 50).await;

        let result = engine
            .transfer_tx(
                &ctx,
                TransferTxParams {
                    from_account_id: a.id,
                    to_account_id: b.id,
                    amount: 10,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.transfer.from_account_id, a.id);
        assert_eq!(result.transfer.to_account_id, b.id);
        assert_eq!(result.transfer.amount, 10);
        assert_eq!(result.from_entry.account_id, a.id);
        assert_eq!(result.from_entry.amount, -10);
        assert_eq!(result.to_entry.account_id, b.id);
        assert_eq!(result.to_entry.amount, 10);
        assert_eq!(result.from_account.id, a.id);
        assert_eq!(result.from_account.balance, 90);
        assert_eq!(result.to_account.id, b.id);
        assert_eq!(result.to_account.balance, 60);

        let store = engine.store();
        assert_eq!(store.get_transfer(&ctx, result.transfer.id).await.unwrap(), result.transfer);
        assert_eq!(store.get_entry(&ctx, result.from_entry.id).await.unwrap(), result.from_entry);
        assert_eq!(store.get_entry(&ctx, result.to_entry.id).await.unwrap(), result.to_entry);
    }

    #[tokio::test]
    async fn test_transfer_tx_from_larger_id_maps_accounts_back() {
        let engine = engine();
        let ctx = TxContext::background();
        let a = open(&engine, "a", 100).await;
        let b = open(&engine, "b", 50).await;

        let result = engine
            .transfer_tx(
                &ctx,
                TransferTxParams {
                    from_account_id: b.id,
                    to_account_id: a.id,
                    amount: 30,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.from_account.id, b.id);
        assert_eq!(result.from_account.balance, 20);
        assert_eq!(result.to_account.id, a.id);
        assert_eq!(result.to_account.balance, 130);
    }

    #[tokio::test]
    async fn test_transfer_tx_allows_negative_balance() {
        let engine = engine();
        let ctx = TxContext::background();
        let a = open(&engine, "a", 5).await;
        let b = open(&engine, "b", 0).await;

        let result = engine
            .transfer_tx(
                &ctx,
                TransferTxParams {
                    from_account_id: a.id,
                    to_account_id: b.id,
                    amount: 20,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.from_account.balance, -15);
        assert_eq!(result.to_account.balance, 20);
    }

    #[tokio::test]
    async fn test_transfer_tx_to_missing_account_leaves_nothing_behind() {
        let engine = engine();
        let ctx = TxContext::background();
        let a = open(&engine, "a", 100).await;

        let result = engine
            .transfer_tx(
                &ctx,
                TransferTxParams {
                    from_account_id: a.id,
                    to_account_id: 404,
                    amount: 10,
                },
            )
            .await;

        assert_eq!(result.unwrap_err(), LedgerError::account_not_found(404));
        let store = engine.store();
        assert_eq!(store.get_account(&ctx, a.id).await.unwrap().balance, 100);
        let transfers = store
            .list_transfers(&ctx, a.id, 404, PageParams::new(10, 0))
            .await
            .unwrap();
        assert!(transfers.is_empty());
    }

    #[tokio::test]
    async fn test_transfer_tx_to_same_account_nets_to_zero() {
        let engine = engine();
        let ctx = TxContext::background();
        let a = open(&engine, "a", 100).await;

        let result = engine
            .transfer_tx(
                &ctx,
                TransferTxParams {
                    from_account_id: a.id,
                    to_account_id: a.id,
                    amount: 10,
                },
            )
            .await
            .unwrap();

        // Credit is applied first on a tie, so the destination snapshot is the midpoint
        assert_eq!(result.to_account.balance, 110);
        assert_eq!(result.from_account.balance, 100);
        assert_eq!(result.from_entry.amount + result.to_entry.amount, 0);
        let stored = engine.store().get_account(&ctx, a.id).await.unwrap();
        assert_eq!(stored.balance, 100);
    }
}
