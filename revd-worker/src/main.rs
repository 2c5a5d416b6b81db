//! revd-worker - Background review enrichment
//!
//! Consumes the enrichment queue written by revd-api, asking a local
//! Ollama model for tone and sentiment labels and writing them into the
//! shared database.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use revd_worker::{Classifier, EnrichmentWorker, OllamaClassifier, WorkerConfig};

/// Command-line arguments for revd-worker
#[derive(Parser, Debug)]
#[command(name = "revd-worker")]
#[command(about = "Background review enrichment worker for REVD")]
#[command(version)]
struct Args {
    /// Data folder containing the shared database
    #[arg(short, long, env = "REVD_DATA")]
    data_folder: Option<String>,

    /// Base URL of the Ollama server
    #[arg(long, default_value = revd_worker::DEFAULT_OLLAMA_URL, env = "REVD_OLLAMA_URL")]
    ollama_url: String,

    /// Model to use for classification
    #[arg(long, default_value = revd_worker::DEFAULT_MODEL, env = "REVD_OLLAMA_MODEL")]
    model: String,

    /// Number of concurrent claim loops
    #[arg(long, default_value = "2", env = "REVD_WORKER_CONCURRENCY")]
    concurrency: usize,

    /// Seconds to wait between queue polls when idle
    #[arg(long, default_value = "2", env = "REVD_POLL_INTERVAL")]
    poll_interval: u64,

    /// Executions allowed per job before it is marked failed
    #[arg(long, default_value = "5", env = "REVD_MAX_ATTEMPTS")]
    max_attempts: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revd_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting revd-worker (model {} at {})", args.model, args.ollama_url);

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

    let classifier: Arc<dyn Classifier> =
        Arc::new(OllamaClassifier::new(&args.ollama_url, &args.model)?);

    let config = WorkerConfig {
        poll_interval: Duration::from_secs(args.poll_interval),
        max_attempts: args.max_attempts,
        concurrency: args.concurrency,
    };

    let worker = Arc::new(EnrichmentWorker::new(db_pool, classifier, config));
    let shutdown = CancellationToken::new();

    let run = tokio::spawn(Arc::clone(&worker).run(shutdown.clone()));

    shutdown_signal().await;
    shutdown.cancel();

    run.await
        .context("Worker task panicked")?
        .context("Worker error")?;

    info!("Worker shutdown complete");
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
