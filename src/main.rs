//! stockpic-storefront server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use stockpic_storefront::api;
use stockpic_storefront::app_state::AppState;
use stockpic_storefront::config::{LogFormat, StoreBackendKind, StorefrontConfig};
use stockpic_storefront::domain::{EventBus, Store};
use stockpic_storefront::persistence::{
    FileBackend, MemoryBackend, PostgresBackend, SnapshotBackend,
};
use stockpic_storefront::service::{
    CreditLedger, GeminiImageGenerator, IdentitySettings, ImageGenerator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = StorefrontConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!(
        addr = %config.listen_addr,
        backend = ?config.store_backend,
        admin_enabled = config.admin.is_some(),
        "starting stockpic-storefront"
    );

    // Build persistence layer
    let backend: Arc<dyn SnapshotBackend> = match config.store_backend {
        StoreBackendKind::File => Arc::new(FileBackend::open(&config.store_dir).await?),
        StoreBackendKind::Postgres => Arc::new(PostgresBackend::connect(&config).await?),
        StoreBackendKind::Memory => {
            tracing::warn!("memory backend selected; state is lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };
    let store = Arc::new(Store::open(backend).await?);

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let generator: Arc<dyn ImageGenerator> =
        Arc::new(GeminiImageGenerator::new(config.image_api.clone())?);
    let app_state = AppState::new(
        store,
        generator,
        IdentitySettings::from_config(&config),
        event_bus,
    );
    let ledger: CreditLedger = app_state.ledger.clone();

    // Build router
    let app = api::build_app(app_state, Duration::from_secs(config.request_timeout_secs));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for reservation in ledger.outstanding().await {
        tracing::warn!(
            reservation_id = %reservation.id,
            account_id = %reservation.account_id,
            amount = reservation.amount,
            reserved_at = %reservation.reserved_at,
            "credit reservation outstanding at shutdown"
        );
    }
    tracing::info!("server stopped");

    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
