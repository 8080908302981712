use {
    crate::services::order_service::OrderService,
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

/// Periodically run the reconciliation sweep. Discrepancies are logged for
/// review, never corrected here.
pub async fn run_reconciler(
    service: Arc<OrderService>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "reconciliation worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("reconciliation worker shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match service.reconcile().await {
            Ok(report) => {
                for discrepancy in &report.discrepancies {
                    tracing::warn!(?discrepancy, "ledger/order discrepancy");
                }
            }
            Err(e) => tracing::error!(error = %e, "reconciliation sweep failed"),
        }
    }
}
