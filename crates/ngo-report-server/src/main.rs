//! NGO Report Server - Main entry point

use anyhow::Result;
use ngo_report_common::logging::{init_logging, LogConfig};
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ngo_report_server::{
    api::{self, AppState},
    config::Config,
    db,
    features::FeatureState,
    ingest::ImportWorker,
    queue::PgQueue,
    storage::{PgJobStore, PgReportStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("ngo-report-server".to_string())
        .filter_directives("ngo_report_server=debug,tower_http=debug,sqlx=warn".to_string())
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    info!("Starting NGO Report Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let features = FeatureState {
        reports: Arc::new(PgReportStore::new(pool.clone())),
        jobs: Arc::new(PgJobStore::new(pool.clone())),
        queue: Arc::new(PgQueue::new(
            pool.clone(),
            Duration::from_secs(config.worker.visibility_timeout_secs),
        )),
    };

    let shutdown = CancellationToken::new();

    let worker_handle = if config.worker.enabled {
        info!("Import worker enabled (RUN_WORKER=true), starting in-process");
        let worker = ImportWorker::new(
            features.jobs.clone(),
            features.reports.clone(),
            features.queue.clone(),
            &config.worker,
        );
        Some(worker.start(shutdown.clone()))
    } else {
        info!("Import worker disabled; run ngo-report-worker to process uploads");
        None
    };

    let state = AppState {
        features,
        db: Some(pool),
    };

    api::serve(
        &config,
        state,
        shutdown_signal(config.server.shutdown_timeout_secs, shutdown.clone()),
    )
    .await?;

    shutdown.cancel();
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            tracing::error!("Import worker task failed: {}", e);
        }
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64, shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Stop leasing new batches while in-flight requests drain
    shutdown.cancel();

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
