//! Feature modules implementing the report portal API
//!
//! Each feature is a vertical slice with its own commands, queries and routes.
//!
//! # Features
//!
//! - **reports**: direct submission, CSV bulk upload, monthly dashboard summary
//! - **jobs**: import job status polling
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! Commands and queries implement [`mediator::Request`] and are tagged with the
//! [`crate::cqrs`] markers. Handlers are plain async functions taking the store
//! and queue handles they need.

pub mod jobs;
pub mod reports;

use axum::Router;

use crate::queue::SharedQueue;
use crate::storage::{SharedJobStore, SharedReportStore};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub reports: SharedReportStore,
    pub jobs: SharedJobStore,
    /// Submission queue feeding the import worker
    pub queue: SharedQueue,
}

/// Creates the router with every feature's routes merged at the root
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .merge(reports::reports_routes())
        .merge(jobs::jobs_routes())
        .with_state(state)
}
