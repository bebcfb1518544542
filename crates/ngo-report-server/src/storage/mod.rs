//! Storage seams for report facts and import jobs
//!
//! Handlers and the import worker depend on the [`ReportStore`] and
//! [`JobStore`] traits only. Production wiring uses the PostgreSQL
//! implementations in [`postgres`]; tests inject the in-memory doubles from
//! [`memory`].

use async_trait::async_trait;
use ngo_report_common::types::{JobStatus, MonthlySummary, ReportFact};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ImportJob;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryJobStore, InMemoryReportStore};
pub use postgres::{PgJobStore, PgReportStore};

/// Storage-level failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The job reached `completed` or `failed` before this write
    #[error("Import job {id} is already {status}")]
    JobFinished { id: Uuid, status: JobStatus },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Upsert-capable store of monthly report facts keyed by `(ngo_id, month)`
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create or fully replace the fact for `(fact.ngo_id, fact.month)`
    async fn upsert_report(&self, fact: &ReportFact) -> StoreResult<()>;

    async fn get_report(&self, ngo_id: &str, month: &str) -> StoreResult<Option<ReportFact>>;

    /// Totals across every NGO for one month; zeros when nothing was reported
    async fn monthly_summary(&self, month: &str) -> StoreResult<MonthlySummary>;
}

/// Persistence for import job records
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, job: &ImportJob) -> StoreResult<()>;

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<ImportJob>>;

    /// Overwrite the mutable fields of an existing job.
    ///
    /// A job that is already `completed` or `failed` is left untouched and
    /// [`StoreError::JobFinished`] is returned.
    async fn save_job(&self, job: &ImportJob) -> StoreResult<()>;
}

pub type SharedReportStore = Arc<dyn ReportStore>;
pub type SharedJobStore = Arc<dyn JobStore>;
