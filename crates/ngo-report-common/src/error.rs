//! Error types for the report portal domain

use thiserror::Error;

use crate::types::JobStatus;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Main domain error type
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid job status: {0}")]
    InvalidJobStatus(String),

    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}
