//! Device Registry - Entry point.

use device_registry::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::{Config, LogFormat},
    store, Directory, RecordStore,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    match config.log.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    info!("Starting Device Registry");
    warn!("Registration API has no authentication; restrict network access to it");

    let store = match store::open(&config.store).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open record store: {}", e);
            std::process::exit(1);
        }
    };

    match store.count().await {
        Ok(n) => info!("Record store holds {} registrations", n),
        Err(e) => warn!("Could not count registrations: {}", e),
    }

    let directory = Directory::with_mode(store, config.directory.write_mode);
    info!(mode = ?directory.mode(), "Directory ready");

    let state = AppState::new(directory);
    let rate_limit = RateLimitState::from_config(&config.rate_limit);
    let app = create_router_with_rate_limit(state, rate_limit);

    let listen_addr = match config.server.listen_addr.parse() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid listen address {}: {}", config.server.listen_addr, e);
            std::process::exit(1);
        }
    };
    let addr = SocketAddr::new(listen_addr, config.server.port);

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Device Registry stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
