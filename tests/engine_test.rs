//! Engine integration tests against the in-memory collaborators.
//!
//! These exercise the full executor/compensator paths, including the
//! monetary invariants under concurrent orders for a single user.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use futures::future::join_all;
use uuid::Uuid;

use papertrade_backend::config::EngineConfig;
use papertrade_backend::db::memory::{MemoryLedgerStore, MemoryUserStore};
use papertrade_backend::db::{BalanceProvider, LedgerStore};
use papertrade_backend::errors::AppError;
use papertrade_backend::models::{
    CreateTransaction, HistoryFilter, PageParams, TransactionStatus, TransactionType,
};
use papertrade_backend::services::holdings_service;
use papertrade_backend::services::stats_service;
use papertrade_backend::services::{InMemoryLockProvider, TransactionEngine, UserLockService};

struct Harness {
    engine: TransactionEngine,
    ledger: Arc<MemoryLedgerStore>,
    users: Arc<MemoryUserStore>,
}

fn harness() -> Harness {
    let ledger = Arc::new(MemoryLedgerStore::new());
    let users = Arc::new(MemoryUserStore::new());
    let locks = UserLockService::new(
        Arc::new(InMemoryLockProvider::new()),
        EngineConfig::default(),
    );
    let engine = TransactionEngine::new(ledger.clone(), users.clone(), locks);
    Harness {
        engine,
        ledger,
        users,
    }
}

fn order(
    user_id: Uuid,
    transaction_type: TransactionType,
    stock_code: &str,
    quantity: i64,
    price: i64,
) -> CreateTransaction {
    CreateTransaction {
        user_id,
        transaction_type,
        stock_code: stock_code.to_string(),
        stock_name: format!("{} Corp", stock_code),
        quantity,
        price_per_unit: BigDecimal::from(price),
        notes: None,
        order_id: None,
    }
}

#[tokio::test]
async fn end_to_end_buy_sell_cancel() {
    let h = harness();
    let user = Uuid::new_v4();
    h.users.add_user(user, "End To End", BigDecimal::from(1_000_000));

    let buy = h
        .engine
        .create_transaction(order(user, TransactionType::Buy, "VNM", 10, 50_000))
        .await
        .unwrap();
    assert_eq!(buy.total_amount, BigDecimal::from(500_000));
    assert_eq!(buy.balance_after, Some(BigDecimal::from(500_000)));

    let sell = h
        .engine
        .create_transaction(order(user, TransactionType::Sell, "VNM", 4, 60_000))
        .await
        .unwrap();
    assert_eq!(sell.total_amount, BigDecimal::from(240_000));
    assert_eq!(sell.balance_after, Some(BigDecimal::from(740_000)));

    let cancelled = h
        .engine
        .cancel_transaction(sell.id, user, None)
        .await
        .unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("User requested cancellation")
    );

    let balance = h.users.get_balance(user).await.unwrap();
    assert_eq!(balance, BigDecimal::from(500_000));

    // The cancelled sell no longer affects the derived position
    let records = h.ledger.fetch_completed_for_user(user).await.unwrap();
    assert_eq!(holdings_service::net_quantity(&records, "VNM"), 10);
}

#[tokio::test]
async fn ledger_invariants_hold_for_every_record() {
    let h = harness();
    let user = Uuid::new_v4();
    h.users.add_user(user, "Invariants", BigDecimal::from(10_000));

    for (transaction_type, quantity, price) in [
        (TransactionType::Buy, 10, 300),
        (TransactionType::Buy, 4, 500),
        (TransactionType::Sell, 6, 450),
    ] {
        h.engine
            .create_transaction(order(user, transaction_type, "FPT", quantity, price))
            .await
            .unwrap();
    }

    let page = h
        .engine
        .get_transaction_history(user, HistoryFilter::default(), PageParams::default())
        .await
        .unwrap();
    for record in &page.transactions {
        assert_eq!(
            record.total_amount,
            &record.price_per_unit * BigDecimal::from(record.quantity)
        );
        let after = record.balance_after.clone().expect("completed record");
        match record.transaction_type {
            TransactionType::Buy => {
                assert_eq!(after, &record.balance_before - &record.total_amount);
                assert!(record.balance_before >= record.total_amount);
            }
            TransactionType::Sell => {
                assert_eq!(after, &record.balance_before + &record.total_amount);
            }
        }
    }
}

#[tokio::test]
async fn parallel_buys_never_overdraw() {
    let h = harness();
    let user = Uuid::new_v4();
    // Room for exactly three 300-cost orders out of ten attempts
    h.users.add_user(user, "Contender", BigDecimal::from(1_000));

    let engine = Arc::new(h.engine.clone());
    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .create_transaction(order(user, TransactionType::Buy, "VNM", 3, 100))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientFunds { .. })))
        .count();
    assert_eq!(succeeded, 3);
    assert_eq!(rejected, 7);

    let balance = h.users.get_balance(user).await.unwrap();
    assert_eq!(balance, BigDecimal::from(100));
    assert!(balance >= BigDecimal::from(0));

    // Serialized mutations: every completed record saw a distinct balance_before
    let completed = h.ledger.fetch_completed_for_user(user).await.unwrap();
    let mut befores: Vec<BigDecimal> =
        completed.iter().map(|r| r.balance_before.clone()).collect();
    befores.sort();
    befores.dedup();
    assert_eq!(befores.len(), 3);
}

#[tokio::test]
async fn cancel_refund_survives_unrelated_traffic() {
    let h = harness();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    h.users.add_user(alice, "Alice", BigDecimal::from(1_000_000));
    h.users.add_user(bob, "Bob", BigDecimal::from(500_000));

    let alice_buy = h
        .engine
        .create_transaction(order(alice, TransactionType::Buy, "VNM", 10, 50_000))
        .await
        .unwrap();

    // Other users keep trading in between
    h.engine
        .create_transaction(order(bob, TransactionType::Buy, "FPT", 3, 10_000))
        .await
        .unwrap();
    h.engine
        .create_transaction(order(bob, TransactionType::Sell, "FPT", 1, 12_000))
        .await
        .unwrap();

    h.engine
        .cancel_transaction(alice_buy.id, alice, Some("changed my mind".into()))
        .await
        .unwrap();

    assert_eq!(
        h.users.get_balance(alice).await.unwrap(),
        BigDecimal::from(1_000_000)
    );
    // Bob's balance reflects only his own trades
    assert_eq!(
        h.users.get_balance(bob).await.unwrap(),
        BigDecimal::from(482_000)
    );
}

#[tokio::test]
async fn sell_is_bounded_by_remaining_position() {
    let h = harness();
    let user = Uuid::new_v4();
    h.users.add_user(user, "Bounded", BigDecimal::from(100_000));

    h.engine
        .create_transaction(order(user, TransactionType::Buy, "VNM", 10, 1_000))
        .await
        .unwrap();
    h.engine
        .create_transaction(order(user, TransactionType::Sell, "VNM", 6, 1_000))
        .await
        .unwrap();

    let err = h
        .engine
        .create_transaction(order(user, TransactionType::Sell, "VNM", 5, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientHoldings {
            requested: 5,
            held: 4,
            ..
        }
    ));
}

#[tokio::test]
async fn stats_follow_the_completed_subset() {
    let h = harness();
    let user = Uuid::new_v4();
    h.users.add_user(user, "Stats", BigDecimal::from(50_000));

    h.engine
        .create_transaction(order(user, TransactionType::Buy, "VNM", 10, 1_000))
        .await
        .unwrap();
    let sell = h
        .engine
        .create_transaction(order(user, TransactionType::Sell, "VNM", 5, 1_200))
        .await
        .unwrap();

    let stats = stats_service::get_user_transaction_stats(
        h.ledger.as_ref(),
        h.users.as_ref(),
        user,
    )
    .await
    .unwrap();
    assert_eq!(stats.total_buy_amount, BigDecimal::from(10_000));
    assert_eq!(stats.total_sell_amount, BigDecimal::from(6_000));
    assert_eq!(stats.net_cash_flow, BigDecimal::from(-4_000));

    // Cancelling the sell removes it from the COMPLETED subset
    h.engine.cancel_transaction(sell.id, user, None).await.unwrap();
    let stats = stats_service::get_user_transaction_stats(
        h.ledger.as_ref(),
        h.users.as_ref(),
        user,
    )
    .await
    .unwrap();
    assert_eq!(stats.total_sell_transactions, 0);
    assert_eq!(stats.net_cash_flow, BigDecimal::from(-10_000));
}
