//! NGO Report Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the NGO report portal.
//!
//! # Overview
//!
//! This crate provides functionality used by both the HTTP server and the
//! import worker:
//!
//! - **Error Handling**: Domain error type and result alias
//! - **Types**: Report facts, raw CSV rows, import batches and job status
//! - **Logging**: Centralized `tracing` subscriber initialization
//!
//! # Example
//!
//! ```no_run
//! use ngo_report_common::types::{JobStatus, RowErrors, RowError};
//!
//! let mut errors = RowErrors::new();
//! errors.push(RowError::new(2, "ngoId or month missing"));
//! assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ReportError, Result};
