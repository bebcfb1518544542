//! Job routes
//!
//! Public read-only route for polling import progress.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::queries::{get_job::handle as handle_get_job, GetJobError, GetJobQuery};
use crate::error::AppError;
use crate::features::FeatureState;

/// Create job routes
pub fn jobs_routes() -> Router<FeatureState> {
    Router::new().route("/job-status/:job_id", get(get_job_status))
}

/// Get the status of one import job
///
/// GET /job-status/:job_id
#[tracing::instrument(skip(state))]
async fn get_job_status(
    State(state): State<FeatureState>,
    Path(job_id): Path<String>,
) -> Result<Response, AppError> {
    let view = handle_get_job(state.jobs.clone(), GetJobQuery { job_id }).await?;

    Ok((StatusCode::OK, Json(view)).into_response())
}

impl From<GetJobError> for AppError {
    fn from(err: GetJobError) -> Self {
        match err {
            GetJobError::NotFound => AppError::NotFound("Job not found".to_string()),
            GetJobError::Store(e) => AppError::Store(e),
        }
    }
}
