//! Persisted records owned by the server

use chrono::{DateTime, Utc};
use ngo_report_common::{
    types::{JobStatus, RowErrors},
    ReportError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress ledger for one CSV import.
///
/// Only the import worker mutates a job after creation, and every status
/// change goes through [`JobStatus::transition`], so a job never moves
/// backwards or out of a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub total_rows: Option<i64>,
    pub processed_rows: i64,
    pub failed_rows: i64,
    pub errors: RowErrors,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// A fresh `pending` job
    pub fn new(total_rows: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            total_rows,
            processed_rows: 0,
            failed_rows: 0,
            errors: RowErrors::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn move_to(&mut self, next: JobStatus) -> Result<(), ReportError> {
        self.status = self.status.transition(next)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start_processing(&mut self) -> Result<(), ReportError> {
        self.move_to(JobStatus::Processing)
    }

    /// Record final counts and mark the job `completed`.
    ///
    /// Counts replace whatever a previous delivery of the same batch wrote.
    pub fn complete(
        &mut self,
        processed_rows: i64,
        failed_rows: i64,
        errors: RowErrors,
    ) -> Result<(), ReportError> {
        self.move_to(JobStatus::Completed)?;
        self.processed_rows = processed_rows;
        self.failed_rows = failed_rows;
        self.errors = errors;
        Ok(())
    }

    pub fn fail(&mut self) -> Result<(), ReportError> {
        self.move_to(JobStatus::Failed)
    }

    /// Publish intermediate progress while `processing`.
    ///
    /// Counters only move forward here, so a redelivered batch does not make a
    /// poller see progress shrink before the final counts land.
    pub fn record_progress(&mut self, processed_rows: i64, failed_rows: i64, errors: &RowErrors) {
        self.processed_rows = self.processed_rows.max(processed_rows);
        self.failed_rows = self.failed_rows.max(failed_rows);
        if errors.len() > self.errors.len() {
            self.errors = errors.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Client-facing projection of an [`ImportJob`] returned by the status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub status: JobStatus,
    pub processed_rows: i64,
    pub failed_rows: i64,
    pub total_rows: Option<i64>,
    pub errors: RowErrors,
}

impl From<ImportJob> for JobStatusView {
    fn from(job: ImportJob) -> Self {
        Self {
            status: job.status,
            processed_rows: job.processed_rows,
            failed_rows: job.failed_rows,
            total_rows: job.total_rows,
            errors: job.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngo_report_common::types::RowError;

    #[test]
    fn test_new_job_is_pending() {
        let job = ImportJob::new(Some(3));
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_rows, Some(3));
        assert_eq!(job.processed_rows, 0);
        assert!(job.errors.is_empty());
    }

    #[test]
    fn test_lifecycle_pending_processing_completed() {
        let mut job = ImportJob::new(None);
        job.start_processing().unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        let mut errors = RowErrors::new();
        errors.push(RowError::new(2, "ngoId or month missing"));
        job.complete(2, 1, errors).unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed_rows, 2);
        assert_eq!(job.failed_rows, 1);
        assert_eq!(job.errors.len(), 1);
    }

    #[test]
    fn test_completed_job_is_immutable() {
        let mut job = ImportJob::new(None);
        job.start_processing().unwrap();
        job.complete(1, 0, RowErrors::new()).unwrap();

        assert!(job.start_processing().is_err());
        assert!(job.fail().is_err());
        assert!(job.complete(5, 5, RowErrors::new()).is_err());
        assert_eq!(job.processed_rows, 1);
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = ImportJob::new(None);
        job.start_processing().unwrap();
        job.record_progress(100, 4, &RowErrors::new());
        job.record_progress(40, 1, &RowErrors::new());

        assert_eq!(job.processed_rows, 100);
        assert_eq!(job.failed_rows, 4);
    }

    #[test]
    fn test_status_view_serialization() {
        let job = ImportJob::new(Some(10));
        let json = serde_json::to_value(JobStatusView::from(job)).unwrap();

        assert_eq!(json["status"], "pending");
        assert_eq!(json["processedRows"], 0);
        assert_eq!(json["failedRows"], 0);
        assert_eq!(json["totalRows"], 10);
        assert_eq!(json["errors"], serde_json::json!([]));
    }
}
