//! Standalone import worker
//!
//! Drains the PostgreSQL submission queue without serving HTTP. Any number of
//! these can run next to the server; queue leases keep each batch on a single
//! worker at a time.

use anyhow::Result;
use ngo_report_common::logging::{init_logging, LogConfig};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

use ngo_report_server::{
    config::Config,
    db,
    ingest::ImportWorker,
    queue::PgQueue,
    storage::{PgJobStore, PgReportStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("ngo-report-worker".to_string())
        .filter_directives("ngo_report_server=debug,sqlx=warn".to_string())
        .build()
        .merge_env()?;

    init_logging(&log_config)?;

    let config = Config::load()?;
    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let worker = ImportWorker::new(
        Arc::new(PgJobStore::new(pool.clone())),
        Arc::new(PgReportStore::new(pool.clone())),
        Arc::new(PgQueue::new(
            pool,
            Duration::from_secs(config.worker.visibility_timeout_secs),
        )),
        &config.worker,
    );

    let shutdown = CancellationToken::new();
    let handle = worker.start(shutdown.clone());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
            }
            info!("Received Ctrl+C, finishing current batch");
        },
        _ = terminate_signal() => {
            info!("Received terminate signal, finishing current batch");
        },
    }

    shutdown.cancel();
    handle.await?;

    info!("Worker shut down gracefully");

    Ok(())
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut signal) => {
            signal.recv().await;
        },
        Err(e) => {
            tracing::error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        },
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
