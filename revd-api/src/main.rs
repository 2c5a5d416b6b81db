//! revd-api - Review read/write service
//!
//! Serves review listings and category trends over HTTP, appending
//! review versions on write and handing rows with missing tone/sentiment
//! annotations to the enrichment queue consumed by revd-worker.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use revd_api::{AppState, DEFAULT_PAGE_SIZE};

/// Command-line arguments for revd-api
#[derive(Parser, Debug)]
#[command(name = "revd-api")]
#[command(about = "Review read/write service for REVD")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "6380", env = "REVD_API_PORT")]
    port: u16,

    /// Data folder containing the shared database
    #[arg(short, long, env = "REVD_DATA")]
    data_folder: Option<String>,

    /// Rows per page for review listings
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, env = "REVD_PAGE_SIZE")]
    page_size: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revd_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting revd-api on port {}", args.port);

    // Resolve the data folder and open the shared database
    let data_folder = revd_common::config::resolve_data_folder(args.data_folder.as_deref())
        .context("Failed to resolve data folder")?;
    revd_common::config::ensure_data_folder(&data_folder)
        .context("Failed to create data folder")?;

    let db_path = revd_common::config::database_path(&data_folder);
    info!("Database: {}", db_path.display());

    let db_pool = revd_common::db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    let state = AppState::new(db_pool, args.page_size);
    let app = revd_api::build_router(state);

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
