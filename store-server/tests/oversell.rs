//! 并发超卖测试
//!
//! 多个任务同时抢购同一商品，库存永不为负，成功数恰好等于库存

mod common;

use std::sync::Arc;

use futures::future::join_all;
use store_server::db::{DbOptions, DbService};
use store_server::{Actor, InventoryLedger, OrderEngine, OrderError};

const STOCK: i64 = 10;
const BUYERS: usize = 24;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oversell.db");
    let db = DbService::new(
        path.to_str().unwrap(),
        DbOptions {
            busy_timeout_ms: 10_000,
            max_connections: 8,
        },
    )
    .await
    .unwrap();

    let ledger = InventoryLedger::new(db.pool.clone());
    let buyer = common::user(&db.pool, "Hedy", None).await;
    let p = common::product(&ledger, "HOT", 5.0, STOCK).await;
    let engine = Arc::new(OrderEngine::new(db.pool.clone(), 5));
    let product_id = p.id;

    let mut handles = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        let engine = engine.clone();
        let actor = Actor::customer(buyer.id);
        handles.push(tokio::spawn(async move {
            engine
                .create_order(&actor, common::order_input(&[(product_id, 1)]))
                .await
        }));
    }

    let mut sold = 0;
    let mut rejected = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => sold += 1,
            Err(OrderError::InsufficientStock { available, .. }) => {
                assert_eq!(available, 0);
                rejected += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(sold, STOCK);
    assert_eq!(rejected, BUYERS as i64 - STOCK);

    let product = ledger.get_product(p.id).await.unwrap();
    assert_eq!(product.stock, 0);
    assert_eq!(product.sold_count, STOCK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancels_restock_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cancel.db");
    let db = DbService::new(path.to_str().unwrap(), DbOptions::default())
        .await
        .unwrap();

    let ledger = InventoryLedger::new(db.pool.clone());
    let buyer = common::user(&db.pool, "Ada", None).await;
    let p = common::product(&ledger, "ONE", 3.0, 4).await;
    let engine = Arc::new(OrderEngine::new(db.pool.clone(), 5));
    let actor = Actor::customer(buyer.id);

    let order = engine
        .create_order(&actor, common::order_input(&[(p.id, 4)]))
        .await
        .unwrap();
    let order_id = order.id;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .transition_status(
                    &actor,
                    order_id,
                    shared::models::StatusUpdate::to(shared::models::OrderStatus::Cancelled),
                )
                .await
        }));
    }
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let product = ledger.get_product(p.id).await.unwrap();
    assert_eq!(product.stock, 4);
    assert_eq!(product.sold_count, 0);
}
