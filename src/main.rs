use {
    order_recon::{
        AppState,
        adapters::{http, notifier::LogReceiptNotifier, stripe_client::StripeGateway},
        config::AppConfig,
        domain::store::{CheckoutWriter, LedgerStore, OrderStore},
        infra::{
            memory::{MemoryCart, MemoryLedgerStore, MemoryOrderStore},
            postgres::PgStore,
        },
        services::{
            commit::SplitCheckoutWriter,
            order_service::{OrderService, OrderServiceDeps, SigningSecrets},
            worker::run_reconciler,
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tower_http::{timeout::TimeoutLayer, trace::TraceLayer},
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("invalid configuration");
    tracing::info!(?config, "configuration loaded");

    let (orders, ledger, writer): (
        Arc<dyn OrderStore>,
        Arc<dyn LedgerStore>,
        Arc<dyn CheckoutWriter>,
    ) = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .acquire_timeout(Duration::from_secs(3))
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = Arc::new(PgStore::new(pool));
            store.migrate().await.expect("failed to run migrations");
            tracing::info!("using postgres store");
            let orders: Arc<dyn OrderStore> = store.clone();
            let ledger: Arc<dyn LedgerStore> = store.clone();
            (orders, ledger, store as Arc<dyn CheckoutWriter>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders and ledger are in-memory only");
            let orders: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
            let ledger: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
            let writer: Arc<dyn CheckoutWriter> =
                Arc::new(SplitCheckoutWriter::new(orders.clone(), ledger.clone()));
            (orders, ledger, writer)
        }
    };

    let service = Arc::new(OrderService::new(OrderServiceDeps {
        orders,
        ledger,
        writer,
        gateway: Arc::new(StripeGateway::new(&config.stripe_secret_key)),
        cart: Arc::new(MemoryCart::new()),
        notifier: Arc::new(LogReceiptNotifier::new(config.receipt_sender.clone())),
        secrets: SigningSecrets {
            key_secret: config.payment_key_secret.clone().into_bytes(),
            webhook_secret: config.payment_webhook_secret.clone().into_bytes(),
        },
        currency: config.currency,
        reconcile_settle: config.reconcile_settle,
    }));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = config.reconcile_interval.map(|interval| {
        tokio::spawn(run_reconciler(
            Arc::clone(&service),
            interval,
            shutdown_rx.clone(),
        ))
    });

    let app = http::router(AppState { service })
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = reconciler {
        let _ = handle.await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
