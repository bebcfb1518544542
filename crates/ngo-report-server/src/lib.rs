//! NGO Report Server Library
//!
//! HTTP server and background importer for NGO monthly reports.
//!
//! # Overview
//!
//! - **Direct submission**: `POST /report` creates or replaces one NGO's
//!   figures for a month
//! - **Bulk import**: `POST /reports/upload` accepts a CSV file, opens an
//!   import job and queues the rows; `GET /job-status/:job_id` reports progress
//! - **Dashboard**: `GET /dashboard?month=YYYY-MM` sums a month across NGOs
//!
//! # Architecture
//!
//! The upload path and the [`ingest::ImportWorker`] only meet through the
//! submission queue ([`queue`]) and the persisted import job ([`models`]).
//! The worker can run inside the server process (`RUN_WORKER=true`) or as the
//! standalone `ngo-report-worker` binary.
//!
//! Handlers follow a command/query split ([`cqrs`]) organised in vertical
//! feature slices ([`features`]). Stores and the queue sit behind traits, with
//! PostgreSQL implementations for production and in-memory ones for tests.
//!
//! ## Framework Stack
//!
//! - **Axum**: HTTP routing and extraction
//! - **SQLx**: PostgreSQL access and embedded migrations
//! - **Tower**: Middleware (CORS, tracing, compression)
//!
//! # Example
//!
//! ```no_run
//! use ngo_report_server::{api, config::Config, db, features::FeatureState, queue, storage};
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::run_migrations(&pool).await?;
//!
//!     let features = FeatureState {
//!         reports: Arc::new(storage::PgReportStore::new(pool.clone())),
//!         jobs: Arc::new(storage::PgJobStore::new(pool.clone())),
//!         queue: Arc::new(queue::PgQueue::new(pool.clone(), Duration::from_secs(300))),
//!     };
//!     let state = api::AppState { features, db: Some(pool) };
//!
//!     api::serve(&config, state, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod storage;

// Re-export commonly used types
pub use error::AppError;
