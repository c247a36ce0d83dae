//! chainpay HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p chainpay-server --release
//!
//! # Run with custom config path
//! CONFIG=/path/to/config.toml cargo run -p chainpay-server
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p chainpay-server
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `8080`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, header};
use chainpay::MemoryIntentStore;
use tower::ServiceBuilder;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chainpay_server::config::ServerConfig;
use chainpay_server::handlers::{AppState, OWNER_HEADER, SharedStore, router};
use chainpay_server::store::JsonFileStore;

#[tokio::main]
async fn main() {
    // Values from .env are visible to config expansion; real env wins.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;
    let payment = &config.payment;
    tracing::info!(
        host = %config.host,
        port = config.port,
        chain_id = payment.chain_id,
        asset = payment.asset_symbol(),
        required_confirmations = payment.required_confirmations,
        "Loaded configuration"
    );

    if let Err(e) = payment.treasury() {
        tracing::error!(error = %e, "Intent creation will fail until a treasury address is set");
    }

    let store: SharedStore = match &config.store_path {
        Some(path) => Arc::new(JsonFileStore::open(path).await?),
        None => {
            tracing::warn!("No store_path configured; intents are kept in memory only");
            Arc::new(MemoryIntentStore::new())
        }
    };

    let state = Arc::new(AppState::from_config(config.payment.clone(), store));

    let app = router(state).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::HeaderName::from_static(OWNER_HEADER)]),
        ),
    );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("chainpay listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("chainpay shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM (Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down..."),
            () = terminate => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!("Received Ctrl-C, shutting down...");
    }
}
