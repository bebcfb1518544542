//! Get job query
//!
//! Status projection of one import job.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::JobStatusView;
use crate::storage::{SharedJobStore, StoreError};

/// Query to get a job by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: String,
}

/// Error type for get job query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job not found")]
    NotFound,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<JobStatusView, GetJobError>> for GetJobQuery {}

impl crate::cqrs::Query for GetJobQuery {}

/// Look up a job; ids that are not UUIDs cannot exist and are not found
pub async fn handle(jobs: SharedJobStore, query: GetJobQuery) -> Result<JobStatusView, GetJobError> {
    let id = Uuid::parse_str(query.job_id.trim()).map_err(|_| GetJobError::NotFound)?;

    let job = jobs.find_job(id).await?.ok_or(GetJobError::NotFound)?;

    Ok(JobStatusView::from(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportJob;
    use crate::storage::{InMemoryJobStore, JobStore};
    use ngo_report_common::types::JobStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_existing_job() {
        let store = Arc::new(InMemoryJobStore::new());
        let job = ImportJob::new(Some(3));
        store.insert_job(&job).await.unwrap();

        let view = handle(
            store,
            GetJobQuery {
                job_id: job.id.to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(view.status, JobStatus::Pending);
        assert_eq!(view.total_rows, Some(3));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_not_found() {
        let store = Arc::new(InMemoryJobStore::new());

        for job_id in [Uuid::new_v4().to_string(), "not-a-uuid".to_string()] {
            let result = handle(store.clone(), GetJobQuery { job_id }).await;
            assert!(matches!(result, Err(GetJobError::NotFound)));
        }
    }
}
