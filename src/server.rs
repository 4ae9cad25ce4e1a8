use anyhow::Result;
use axum::{handler::HandlerWithoutStateExt, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    broadcast::BroadcastHub,
    bus,
    config::{Config, ServerConfig},
    context::AppContext,
    handlers,
    ingest::Ingestor,
    metrics,
    signals::setup_signal_handlers,
    storage::SqliteLogStore,
};

/// Start the hub
///
/// This function:
/// 1. Initializes metrics
/// 2. Opens the database and builds the shared context
/// 3. Spawns the ingestion worker and the bus listener
/// 4. Serves the HTTP surface until a shutdown signal arrives
/// 5. Waits for the bus listener to stop and the ingestion queue to drain
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = match metrics::init_metrics() {
        Ok(handle) => Some(Arc::new(handle)),
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            None
        }
    };

    let store = SqliteLogStore::connect(&config.storage).await?;
    info!(path = %config.storage.database_path, "Database ready");

    let hub = Arc::new(BroadcastHub::new(config.broadcast.observer_buffer));
    let ctx = AppContext::new(Arc::new(store), hub, config.storage.recent_limit);

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let (bus_tx, bus_rx) = mpsc::channel(config.bus.queue_capacity);
    let ingest_handle = Ingestor::new(&ctx).spawn(bus_rx);
    let bus_handle = tokio::spawn(bus::run_bus_listener(
        config.bus.clone(),
        bus_tx,
        shutdown_tx.subscribe(),
    ));

    let app = create_router(ctx, metrics_handle, &config.server);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting loghub on {}", addr);
    info!(
        "Bus: {}:{} (filter '{}'), recent limit {}",
        config.bus.host, config.bus.port, config.bus.topic_filter, config.storage.recent_limit
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    // The listener owns the only queue sender, so the worker exits once it is drained
    bus_handle.await?;
    ingest_handle.await?;
    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    ctx: AppContext,
    metrics_handle: Option<Arc<PrometheusHandle>>,
    server: &ServerConfig,
) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/tables", get(handlers::logs::list_tables))
        .route("/events", get(handlers::events::stream_events))
        .route("/logs/:table", get(handlers::logs::list_logs))
        .route("/:table/:id", get(handlers::logs::get_log))
        .with_state(ctx);

    if let Some(handle) = metrics_handle {
        app = app.merge(
            Router::new()
                .route("/metrics", get(handlers::metrics_handler::metrics))
                .with_state(handle),
        );
    }

    // The UI directory answers every unmatched path, so `/` and its
    // root-level assets resolve like any other file in it
    app = match &server.static_dir {
        Some(dir) => app.nest_service("/ui", ServeDir::new(dir)).fallback_service(
            ServeDir::new(dir).not_found_service(handlers::not_found.into_service()),
        ),
        None => app.fallback(handlers::not_found),
    };

    if server.cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(TraceLayer::new_for_http())
}
