mod common;

use common::*;
use order_recon::domain::error::OrderError;
use order_recon::domain::order::OrderStatus;
use order_recon::domain::store::{LedgerStore, OrderStore};
use std::sync::Arc;
use std::time::Duration;

// ── completion vs webhook race ─────────────────────────────────────────────
// Client completions and gateway webhooks for one reference land at once.
// Exactly one order, exactly one credit, sweep clean.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn completion_and_webhook_race_yields_one_credit() {
    let h = harness();
    let body = webhook_body("payment.captured", "pay_race", "pi_race", 1300);
    let sig = sign_webhook(&body);

    let mut handles = Vec::new();
    for i in 0..10 {
        let service = h.service.clone();
        let body = body.clone();
        let sig = sig.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                service
                    .complete_payment(completion("pi_race", "pay_race", sample_cart()))
                    .await
                    .map(|outcome| outcome.created)
            } else {
                service
                    .handle_webhook(&body, Some(&sig))
                    .await
                    .map(|_| false)
            }
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1, "exactly one completion created the order");
    assert_eq!(h.orders.len(), 1);
    assert_eq!(h.ledger.inner.list_credits().await.unwrap().len(), 1);
    let report = h.service.reconcile().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.discrepancies);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_checkouts_all_land() {
    let h = harness();

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service
                .complete_payment(completion(
                    &format!("pi_many_{i}"),
                    &format!("pay_many_{i}"),
                    sample_cart(),
                ))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().created);
    }

    assert_eq!(h.orders.len(), 20);
    let report = h.service.reconcile().await.unwrap();
    assert_eq!(report.orders_checked, 20);
    assert!(report.is_clean());
}

// ── status transition race ─────────────────────────────────────────────────
// Ten staff members press "Packed" at once. One lands, the rest are told the
// order moved under them or that Packed → Packed is illegal.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_transitions_apply_once() {
    let h = harness();
    let order = h
        .service
        .complete_payment(completion("pi_tr", "pay_tr", sample_cart()))
        .await
        .unwrap()
        .order;

    let mut handles = Vec::new();
    for i in 0..10 {
        let service = h.service.clone();
        let id = order.id();
        handles.push(tokio::spawn(async move {
            service
                .update_status(id, OrderStatus::Packed, &format!("staff:{i}"))
                .await
        }));
    }

    let mut applied = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(OrderError::StatusConflict { .. } | OrderError::InvalidTransition { .. }) => {
                rejected += 1
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(rejected, 9);

    let stored = h.service.get_order(order.id()).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::Packed);
    assert_eq!(stored.status_history().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transitions_leave_a_legal_history() {
    let h = harness();
    let order = h
        .service
        .complete_payment(completion("pi_mix", "pay_mix", sample_cart()))
        .await
        .unwrap()
        .order;

    let targets = [
        OrderStatus::Packed,
        OrderStatus::Cancelled,
        OrderStatus::Shipped,
        OrderStatus::Packed,
        OrderStatus::Cancelled,
        OrderStatus::Delivered,
    ];
    let mut handles = Vec::new();
    for target in targets {
        let service = h.service.clone();
        let id = order.id();
        handles.push(tokio::spawn(async move {
            service.update_status(id, target, "staff:race").await
        }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let stored = h.service.get_order(order.id()).await.unwrap();
    let history = stored.status_history();
    assert_eq!(history[0].status, OrderStatus::Placed);
    for pair in history.windows(2) {
        assert!(
            pair[0].status.can_transition_to(&pair[1].status),
            "illegal step {} → {}",
            pair[0].status,
            pair[1].status
        );
    }
    assert_eq!(history.last().unwrap().status, stored.status());
}

// ── checkout during a sweep ────────────────────────────────────────────────
// The sweep reads orders, then credits. A checkout that commits between the
// two reads must not show up as an orphaned credit.

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn checkout_committed_mid_sweep_is_left_for_next_sweep() {
    let mut gate = None;
    let h = harness_with_order_reads(|orders| {
        let pausing = Arc::new(PausingOrders::new(orders));
        let reads: Arc<dyn OrderStore> = pausing.clone();
        gate = Some(pausing);
        reads
    });
    let gate = gate.unwrap();

    let service = h.service.clone();
    let sweep = tokio::spawn(async move { service.reconcile().await });
    gate.paused.notified().await;

    // Clock has to move past the sweep's cutoff.
    tokio::time::sleep(Duration::from_millis(5)).await;
    h.service
        .complete_payment(completion("pi_sw", "pay_sw", sample_cart()))
        .await
        .unwrap();
    gate.resume.notify_one();

    let report = sweep.await.unwrap().unwrap();
    assert!(report.is_clean(), "{:?}", report.discrepancies);
    assert_eq!(report.orders_checked, 0);
    assert_eq!(report.credits_checked, 0);

    let report = h.service.reconcile().await.unwrap();
    assert!(report.is_clean(), "{:?}", report.discrepancies);
    assert_eq!(report.orders_checked, 1);
    assert_eq!(report.credits_checked, 1);
}
