//! Two orders for the same product reconciled at the same time. Each test
//! forces both reads to happen before either write.

use inventory_service::model::{OrderEvent, OrderLine};
use inventory_service::reconciler::{LineOutcome, WriteMode};
use inventory_service::state_store::InMemoryStateStore;
use inventory_service::AppState;
use std::sync::Arc;

use test_utils::{seed, stored_quantity, InterleavingStore, TEST_STORE_TIMEOUT};

fn order(id: &str, quantity: i64) -> OrderEvent {
    OrderEvent {
        order_id: id.into(),
        customer_id: "C1".into(),
        items: vec![OrderLine { product_id: "P1".into(), quantity, ..Default::default() }],
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_writer_wins_loses_an_update() {
    let inner = InMemoryStateStore::new();
    seed(&inner, "P1", 100).await;
    let state = AppState::new(
        Arc::new(InterleavingStore::new(inner.clone(), 2)),
        TEST_STORE_TIMEOUT,
        WriteMode::LastWriterWins,
    );

    let (a, b) = (order("OA", 30), order("OB", 30));
    let (ra, rb) = tokio::join!(state.reconciler.reconcile(&a), state.reconciler.reconcile(&b));

    // Both report success against the same starting stock.
    assert!(ra.lines[0].outcome.is_applied());
    assert!(rb.lines[0].outcome.is_applied());
    assert_eq!(stored_quantity(&inner, "P1").await, Some(70));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn optimistic_writes_keep_both_decrements() {
    let inner = InMemoryStateStore::new();
    seed(&inner, "P1", 100).await;
    let state = AppState::new(
        Arc::new(InterleavingStore::new(inner.clone(), 2)),
        TEST_STORE_TIMEOUT,
        WriteMode::Optimistic { max_attempts: 3 },
    );

    let (a, b) = (order("OA", 30), order("OB", 30));
    let (ra, rb) = tokio::join!(state.reconciler.reconcile(&a), state.reconciler.reconcile(&b));

    assert!(ra.lines[0].outcome.is_applied());
    assert!(rb.lines[0].outcome.is_applied());
    assert_eq!(stored_quantity(&inner, "P1").await, Some(40));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn optimistic_writes_give_up_after_max_attempts() {
    let inner = InMemoryStateStore::new();
    seed(&inner, "P1", 100).await;
    let state = AppState::new(
        Arc::new(InterleavingStore::new(inner.clone(), 2)),
        TEST_STORE_TIMEOUT,
        WriteMode::Optimistic { max_attempts: 1 },
    );

    let (a, b) = (order("OA", 30), order("OB", 30));
    let (ra, rb) = tokio::join!(state.reconciler.reconcile(&a), state.reconciler.reconcile(&b));

    let outcomes = [&ra.lines[0].outcome, &rb.lines[0].outcome];
    assert_eq!(outcomes.iter().filter(|o| o.is_applied()).count(), 1);
    assert!(outcomes.iter().any(|o| matches!(o, LineOutcome::SkippedConflict { attempts: 1 })));
    assert_eq!(stored_quantity(&inner, "P1").await, Some(70));
}
