//! Import job status and row error ledger

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// Maximum number of row errors retained on a job.
///
/// Rows rejected after the ledger is full still count towards `failedRows`.
pub const MAX_ROW_ERRORS: usize = 50;

/// Lifecycle status of an import job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed moves: `pending -> processing -> {completed, failed}`.
    ///
    /// `processing -> processing` is permitted so a redelivered batch can
    /// resume a job whose previous worker died mid-run. A batch that cannot be
    /// read at all may fail a job straight from `pending`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition(self, next: JobStatus) -> Result<JobStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ReportError::InvalidTransition { from: self, to: next })
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ReportError::InvalidJobStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected row, numbered from the first data row (header excluded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_number: usize,
    pub reason: String,
}

impl RowError {
    pub fn new(row_number: usize, reason: impl Into<String>) -> Self {
        Self {
            row_number,
            reason: reason.into(),
        }
    }
}

/// Ordered, capacity-bounded list of row errors.
///
/// Keeps the first [`MAX_ROW_ERRORS`] entries; later pushes are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowErrors(Vec<RowError>);

impl RowErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error if there is room. Returns whether it was kept.
    pub fn push(&mut self, error: RowError) -> bool {
        if self.is_full() {
            return false;
        }
        self.0.push(error);
        true
    }

    pub fn is_full(&self) -> bool {
        self.0.len() >= MAX_ROW_ERRORS
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowError> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[RowError] {
        &self.0
    }
}

impl From<Vec<RowError>> for RowErrors {
    fn from(mut errors: Vec<RowError>) -> Self {
        errors.truncate(MAX_ROW_ERRORS);
        Self(errors)
    }
}
