//! Format Catalog server - Main entry point
//!
//! Crowd-sourced catalog of media-format support requests with live vote
//! counts pushed to connected browsers over SSE.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fcat_common::db::{get_setting, init_database, set_setting};
use fcat_common::events::EventBus;
use fcat_server::api;

/// Capacity of the catalog event bus. Events beyond this buffer are dropped
/// for lagging subscribers, who then re-fetch the catalog.
const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for fcat-server
#[derive(Parser, Debug)]
#[command(name = "fcat-server")]
#[command(about = "Format catalog service with live vote counts")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5780", env = "FCAT_PORT")]
    port: u16,

    /// Path to the SQLite database file. When absent, resolution falls back
    /// to FCAT_DATABASE, then the config file, then the platform default.
    #[arg(short, long)]
    database: Option<String>,

    /// Admin key for the admin endpoints (generated and persisted if unset)
    #[arg(long, env = "FCAT_ADMIN_KEY")]
    admin_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fcat_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let db_path = fcat_common::config::resolve_database_path(args.database.as_deref(), "FCAT_DATABASE")
        .context("Failed to resolve database path")?;

    info!("Starting FCAT server on port {}", args.port);
    info!("Database: {}", db_path.display());

    let db_pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    // Admin key: CLI/env wins; else the persisted key; else generate one once
    let admin_key = match args.admin_key {
        Some(key) => key,
        None => match get_setting(&db_pool, "admin_key").await? {
            Some(key) => key,
            None => {
                let key = uuid::Uuid::new_v4().to_string();
                set_setting(&db_pool, "admin_key", &key).await?;
                info!("Generated admin key (stored in settings): {}", key);
                key
            }
        },
    };

    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let ctx = api::AppContext::new(db_pool, bus, admin_key);
    let app = api::create_router(ctx);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
