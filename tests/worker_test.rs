mod common;

use common::*;
use order_recon::services::worker::run_reconciler;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::test]
async fn reconciler_stops_on_shutdown() {
    let h = harness();
    h.service
        .complete_payment(completion("pi_wk", "pay_wk", sample_cart()))
        .await
        .unwrap();

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(run_reconciler(
        h.service.clone(),
        Duration::from_millis(10),
        rx,
    ));

    // Let a few sweeps run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker did not stop")
        .unwrap();

    // Sweeps only read.
    assert_eq!(h.orders.len(), 1);
    assert_eq!(h.ledger.inner.len(), 1);
}
