//! Import CSV command
//!
//! Parses an uploaded CSV file, opens an import job for it and queues the rows
//! for the import worker. The handler returns as soon as the batch is queued.

use mediator::Request;
use ngo_report_common::types::ImportBatch;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::ingest::{read_rows_from_path, CsvReadError};
use crate::models::ImportJob;
use crate::queue::{QueueError, SharedQueue};
use crate::storage::{SharedJobStore, StoreError};

pub const UPLOAD_STARTED_MESSAGE: &str = "CSV upload started";

/// Command to import a CSV file already spooled to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCsvCommand {
    /// Name the client gave the file
    pub filename: String,
    /// Location of the spooled upload; the caller owns and removes the file
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCsvResponse {
    pub job_id: Uuid,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportCsvError {
    #[error("CSV file required")]
    FileRequired,

    #[error("Only CSV files allowed")]
    NotCsv,

    #[error("Failed to read upload: {0}")]
    Upload(String),

    #[error(transparent)]
    Parse(#[from] CsvReadError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl Request<Result<ImportCsvResponse, ImportCsvError>> for ImportCsvCommand {}

impl crate::cqrs::Command for ImportCsvCommand {}

/// `true` when the file name ends in `.csv`, in any letter case
pub fn is_csv_filename(filename: &str) -> bool {
    Path::new(filename.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

impl ImportCsvCommand {
    pub fn validate(&self) -> Result<(), ImportCsvError> {
        if self.filename.trim().is_empty() {
            return Err(ImportCsvError::FileRequired);
        }
        if !is_csv_filename(&self.filename) {
            return Err(ImportCsvError::NotCsv);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(jobs, queue, command), fields(filename = %command.filename))]
pub async fn handle(
    jobs: SharedJobStore,
    queue: SharedQueue,
    command: ImportCsvCommand,
) -> Result<ImportCsvResponse, ImportCsvError> {
    command.validate()?;

    let path = command.path.clone();
    let rows = tokio::task::spawn_blocking(move || read_rows_from_path(&path))
        .await
        .map_err(|e| ImportCsvError::Upload(format!("CSV parser task failed: {}", e)))??;

    let mut job = ImportJob::new(Some(rows.len() as i64));
    jobs.insert_job(&job).await?;

    tracing::info!(job_id = %job.id, rows = rows.len(), "Import job created");

    if let Err(e) = queue.enqueue(&ImportBatch::new(job.id, rows)).await {
        tracing::error!(job_id = %job.id, "Failed to queue import batch: {}", e);
        match job.fail() {
            Ok(()) => {
                if let Err(save_err) = jobs.save_job(&job).await {
                    tracing::warn!(job_id = %job.id, "Failed to mark job failed: {}", save_err);
                }
            },
            Err(transition_err) => {
                tracing::warn!(job_id = %job.id, "Cannot fail job: {}", transition_err);
            },
        }
        return Err(e.into());
    }

    Ok(ImportCsvResponse {
        job_id: job.id,
        message: UPLOAD_STARTED_MESSAGE.to_string(),
    })
}
