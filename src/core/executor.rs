//! Transactional executor
//!
//! Runs a unit of work against a fresh transaction so that all of its writes
//! commit together or none do.
//!
//! # Exit paths
//!
//! - unit of work succeeds: commit, return its value (or the commit error)
//! - unit of work fails: roll back, return the original error; if the rollback
//!   also fails, return [`LedgerError::Rollback`] carrying both
//! - unit of work panics or the surrounding future is dropped: the transaction
//!   handle is dropped, which rolls it back and releases its row locks

use super::context::TxContext;
use super::traits::{Transaction, TransactionalStore};
use crate::types::LedgerError;
use futures::future::BoxFuture;
use tracing::{debug, warn};

/// Run `unit_of_work` inside a single transaction on `store`
///
/// The closure receives the transaction and the context, both borrowed for the
/// lifetime of the returned future:
///
/// ```ignore
/// run_in_transaction(&store, &ctx, |tx, ctx| {
///     Box::pin(async move { tx.create_entry(ctx, params).await })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<S, T, F>(
    store: &S,
    ctx: &TxContext,
    unit_of_work: F,
) -> Result<T, LedgerError>
where
    S: TransactionalStore + ?Sized,
    T: Send,
    F: for<'t> FnOnce(&'t mut S::Tx, &'t TxContext) -> BoxFuture<'t, Result<T, LedgerError>>
        + Send,
{
    let mut tx = store.begin(ctx).await?;

    match unit_of_work(&mut tx, ctx).await {
        Ok(value) => {
            tx.commit().await?;
            debug!(parent: ctx.span(), "committed");
            Ok(value)
        }
        Err(error) => match tx.rollback().await {
            Ok(()) => {
                debug!(parent: ctx.span(), error = %error, "rolled back");
                Err(error)
            }
            Err(rollback_error) => {
                warn!(
                    parent: ctx.span(),
                    error = %error,
                    rollback_error = %rollback_error,
                    "rollback failed"
                );
                Err(LedgerError::rollback(error, rollback_error))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{Mutator, Querier};
    use crate::types::{
        Account, AccountId, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
        CreateTransferParams, Entry, EntryId, PageParams, Transfer, TransferId,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    /// Scripted store recording how each transaction ended
    #[derive(Default)]
    struct ScriptedStore {
        fail_commit: bool,
        fail_rollback: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    struct ScriptedTx {
        fail_commit: bool,
        fail_rollback: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScriptedStore {
        fn events(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Querier for ScriptedStore {
        async fn get_account(&self, _: &TxContext, id: AccountId) -> Result<Account, LedgerError> {
            Err(LedgerError::account_not_found(id))
        }
        async fn get_entry(&self, _: &TxContext, id: EntryId) -> Result<Entry, LedgerError> {
            Err(LedgerError::entry_not_found(id))
        }
        async fn get_transfer(
            &self,
            _: &TxContext,
            id: TransferId,
        ) -> Result<Transfer, LedgerError> {
            Err(LedgerError::transfer_not_found(id))
        }
        async fn list_accounts(
            &self,
            _: &TxContext,
            _: PageParams,
        ) -> Result<Vec<Account>, LedgerError> {
            Ok(Vec::new())
        }
        async fn list_entries(
            &self,
            _: &TxContext,
            _: AccountId,
            _: PageParams,
        ) -> Result<Vec<Entry>, LedgerError> {
            Ok(Vec::new())
        }
        async fn list_transfers(
            &self,
            _: &TxContext,
            _: AccountId,
            _: AccountId,
            _: PageParams,
        ) -> Result<Vec<Transfer>, LedgerError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl TransactionalStore for ScriptedStore {
        type Tx = ScriptedTx;

        async fn begin(&self, _: &TxContext) -> Result<ScriptedTx, LedgerError> {
            self.log.lock().unwrap().push("begin");
            Ok(ScriptedTx {
                fail_commit: self.fail_commit,
                fail_rollback: self.fail_rollback,
                log: Arc::clone(&self.log),
            })
        }
    }

    #[async_trait]
    impl Mutator for ScriptedTx {
        async fn create_account(
            &mut self,
            _: &TxContext,
            params: CreateAccountParams,
        ) -> Result<Account, LedgerError> {
            self.log.lock().unwrap().push("create_account");
            Ok(Account {
                id: 1,
                owner_name: params.owner_name,
                balance: 0,
                currency: params.currency,
                created_at: Utc::now(),
            })
        }
        async fn get_account_for_update(
            &mut self,
            _: &TxContext,
            id: AccountId,
        ) -> Result<Account, LedgerError> {
            Err(LedgerError::account_not_found(id))
        }
        async fn create_transfer(
            &mut self,
            _: &TxContext,
            _: CreateTransferParams,
        ) -> Result<Transfer, LedgerError> {
            Err(LedgerError::storage("not scripted"))
        }
        async fn create_entry(
            &mut self,
            _: &TxContext,
            _: CreateEntryParams,
        ) -> Result<Entry, LedgerError> {
            self.log.lock().unwrap().push("create_entry");
            Err(LedgerError::storage("entries table is read-only"))
        }
        async fn add_account_balance(
            &mut self,
            _: &TxContext,
            params: AddAccountBalanceParams,
        ) -> Result<Account, LedgerError> {
            Err(LedgerError::account_not_found(params.id))
        }
    }

    #[async_trait]
    impl Transaction for ScriptedTx {
        async fn commit(self) -> Result<(), LedgerError> {
            self.log.lock().unwrap().push("commit");
            if self.fail_commit {
                Err(LedgerError::commit("could not serialize access"))
            } else {
                Ok(())
            }
        }

        async fn rollback(self) -> Result<(), LedgerError> {
            self.log.lock().unwrap().push("rollback");
            if self.fail_rollback {
                Err(LedgerError::storage("connection reset"))
            } else {
                Ok(())
            }
        }
    }

    fn open_account<'t>(
        tx: &'t mut ScriptedTx,
        ctx: &'t TxContext,
    ) -> BoxFuture<'t, Result<Account, LedgerError>> {
        Box::pin(async move {
            tx.create_account(
                ctx,
                CreateAccountParams {
                    owner_name: "alice".to_string(),
                    currency: "USD".to_string(),
                },
            )
            .await
        })
    }

    #[tokio::test]
    async fn test_success_commits() {
        let store = ScriptedStore::default();
        let ctx = TxContext::new("tx 1");

        let account = run_in_transaction(&store, &ctx, open_account).await.unwrap();

        assert_eq!(account.owner_name, "alice");
        assert_eq!(store.events(), vec!["begin", "create_account", "commit"]);
    }

    #[tokio::test]
    async fn test_commit_failure_surfaces_verbatim() {
        let store = ScriptedStore {
            fail_commit: true,
            ..Default::default()
        };
        let ctx = TxContext::background();

        let result = run_in_transaction(&store, &ctx, open_account).await;

        assert_eq!(
            result.unwrap_err(),
            LedgerError::commit("could not serialize access")
        );
        assert_eq!(store.events(), vec!["begin", "create_account", "commit"]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_returns_original_error() {
        let store = ScriptedStore::default();
        let ctx = TxContext::background();

        let result = run_in_transaction(&store, &ctx, |tx, ctx| {
            Box::pin(async move {
                tx.create_entry(ctx, CreateEntryParams { account_id: 1, amount: 10 })
                    .await
            })
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            LedgerError::storage("entries table is read-only")
        );
        assert_eq!(store.events(), vec!["begin", "create_entry", "rollback"]);
    }

    #[tokio::test]
    async fn test_rollback_failure_combines_both_errors() {
        let store = ScriptedStore {
            fail_rollback: true,
            ..Default::default()
        };
        let ctx = TxContext::background();

        let result = run_in_transaction(&store, &ctx, |tx, ctx| {
            Box::pin(async move {
                tx.create_entry(ctx, CreateEntryParams { account_id: 1, amount: 10 })
                    .await
            })
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            LedgerError::rollback(
                LedgerError::storage("entries table is read-only"),
                LedgerError::storage("connection reset"),
            )
        );
    }
}
