//! Transfer tests against a live PostgreSQL database
//!
//! Ignored by default. Run with:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/ledger cargo test --features postgres -- --ignored
//! ```
#![cfg(feature = "postgres")]

use rust_ledger_engine::core::{LedgerEngine, Querier, TxContext};
use rust_ledger_engine::storage::PgStore;
use rust_ledger_engine::types::{Account, OpenAccountParams, TransferTxParams};
use std::sync::Arc;
use std::time::Duration;

async fn engine() -> LedgerEngine<PgStore> {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgStore::connect(&url, 10).await.expect("connect failed");
    store.migrate().await.expect("migration failed");
    LedgerEngine::new(Arc::new(store))
}

async fn open(engine: &LedgerEngine<PgStore>, owner: &str, balance: i64) -> Account {
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

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_transfers_serialize_in_postgres() {
    let engine = engine().await;
    let x = open(&engine, "pg-x", 100).await;
    let y = open(&engine, "pg-y", 50).await;
    let transfer = TransferTxParams {
        from_account_id: x.id,
        to_account_id: y.id,
        amount: 10,
    };

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .transfer_tx(&TxContext::background(), transfer)
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let ctx = TxContext::background();
    assert_eq!(engine.store().get_account(&ctx, x.id).await.unwrap().balance, 50);
    assert_eq!(engine.store().get_account(&ctx, y.id).await.unwrap().balance, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_opposite_direction_transfers_do_not_deadlock_in_postgres() {
    let engine = engine().await;
    let x = open(&engine, "pg-a", 100).await;
    let y = open(&engine, "pg-b", 100).await;

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let engine = engine.clone();
            let (from, to) = if i % 2 == 0 { (x.id, y.id) } else { (y.id, x.id) };
            tokio::spawn(async move {
                let ctx = TxContext::new(format!("tx {}", i)).with_timeout(Duration::from_secs(10));
                engine
                    .transfer_tx(
                        &ctx,
                        TransferTxParams {
                            from_account_id: from,
                            to_account_id: to,
                            amount: 10,
                        },
                    )
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let ctx = TxContext::background();
    assert_eq!(engine.store().get_account(&ctx, x.id).await.unwrap().balance, 100);
    assert_eq!(engine.store().get_account(&ctx, y.id).await.unwrap().balance, 100);
}
