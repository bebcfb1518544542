//! Report routes
//!
//! - `POST /report` - Create or replace one NGO's monthly report
//! - `POST /reports/upload` - Start a CSV bulk import (multipart field `file`)
//! - `GET /dashboard?month=YYYY-MM` - Monthly totals across all NGOs

use axum::{
    extract::{multipart::Field, rejection::JsonRejection, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::TryStreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use super::{
    commands::{
        import_csv::is_csv_filename, ImportCsvCommand, ImportCsvError, SubmitReportCommand,
        SubmitReportError,
    },
    queries::{MonthlySummaryError, MonthlySummaryQuery},
};
use crate::error::error_response;
use crate::features::FeatureState;

/// Multipart field carrying the CSV file
pub const UPLOAD_FIELD: &str = "file";

pub fn reports_routes() -> Router<FeatureState> {
    Router::new()
        .route("/report", post(submit_report))
        .route("/reports/upload", post(upload_csv))
        .route("/dashboard", get(monthly_summary))
}

/// Submit a single report
///
/// # Response
///
/// - `200 OK` - `{"message": "Report submitted successfully"}`
/// - `400 Bad Request` - Missing ngoId/month or a body that is not JSON
/// - `500 Internal Server Error` - Store failure
#[tracing::instrument(skip(state, body))]
async fn submit_report(
    State(state): State<FeatureState>,
    body: Result<Json<SubmitReportCommand>, JsonRejection>,
) -> Result<Response, ReportApiError> {
    let Json(command) = body.map_err(|e| ReportApiError::BadBody(e.body_text()))?;

    let response = super::commands::submit::handle(state.reports.clone(), command).await?;

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Upload a CSV file for background import
///
/// The upload is spooled to a temporary file that is removed when this
/// handler returns, whatever the outcome.
///
/// # Response
///
/// - `200 OK` - `{"jobId": "...", "message": "CSV upload started"}`
/// - `400 Bad Request` - No file, or the file name does not end in `.csv`
/// - `500 Internal Server Error` - The upload could not be read or parsed
#[tracing::instrument(skip(state, multipart))]
async fn upload_csv(
    State(state): State<FeatureState>,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Result<Response, ReportApiError> {
    let mut multipart = multipart.map_err(|_| ImportCsvError::FileRequired)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportCsvError::Upload(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().trim().to_string();
        if filename.is_empty() {
            return Err(ImportCsvError::FileRequired.into());
        }
        if !is_csv_filename(&filename) {
            return Err(ImportCsvError::NotCsv.into());
        }

        upload = Some((filename, spool(field).await?));
        break;
    }

    let (filename, spooled) = upload.ok_or(ImportCsvError::FileRequired)?;
    let command = ImportCsvCommand {
        filename,
        path: spooled.path().to_path_buf(),
    };

    let result =
        super::commands::import_csv::handle(state.jobs.clone(), state.queue.clone(), command).await;
    drop(spooled);
    let response = result?;

    tracing::info!(job_id = %response.job_id, "CSV upload accepted");

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Stream one multipart field into a fresh temporary file
async fn spool(field: Field<'_>) -> Result<NamedTempFile, ImportCsvError> {
    let spooled = NamedTempFile::new().map_err(|e| ImportCsvError::Upload(e.to_string()))?;
    let file = spooled
        .reopen()
        .map_err(|e| ImportCsvError::Upload(e.to_string()))?;
    let mut out = tokio::fs::File::from_std(file);

    let reader = StreamReader::new(field.map_err(std::io::Error::other));
    tokio::pin!(reader);

    let bytes = tokio::io::copy(&mut reader, &mut out)
        .await
        .map_err(|e| ImportCsvError::Upload(e.to_string()))?;
    out.flush()
        .await
        .map_err(|e| ImportCsvError::Upload(e.to_string()))?;

    tracing::debug!(bytes, path = %spooled.path().display(), "Upload spooled");

    Ok(spooled)
}

/// Monthly totals
///
/// # Response
///
/// - `200 OK` - `{"totalNGOs", "totalPeopleHelped", "totalEvents", "totalFunds"}`
/// - `400 Bad Request` - `month` missing
#[tracing::instrument(skip(state))]
async fn monthly_summary(
    State(state): State<FeatureState>,
    Query(query): Query<MonthlySummaryQuery>,
) -> Result<Response, ReportApiError> {
    let summary = super::queries::summary::handle(state.reports.clone(), query).await?;

    Ok((StatusCode::OK, Json(summary)).into_response())
}

#[derive(Debug)]
enum ReportApiError {
    BadBody(String),
    Submit(SubmitReportError),
    Import(ImportCsvError),
    Summary(MonthlySummaryError),
}

impl From<SubmitReportError> for ReportApiError {
    fn from(err: SubmitReportError) -> Self {
        Self::Submit(err)
    }
}

impl From<ImportCsvError> for ReportApiError {
    fn from(err: ImportCsvError) -> Self {
        Self::Import(err)
    }
}

impl From<MonthlySummaryError> for ReportApiError {
    fn from(err: MonthlySummaryError) -> Self {
        Self::Summary(err)
    }
}

impl IntoResponse for ReportApiError {
    fn into_response(self) -> Response {
        match self {
            ReportApiError::BadBody(message) => error_response(StatusCode::BAD_REQUEST, message),
            ReportApiError::Submit(e @ SubmitReportError::MissingKeyFields) => {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            },
            ReportApiError::Submit(SubmitReportError::Store(e)) => {
                tracing::error!("Failed to store report: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to submit report")
            },
            ReportApiError::Import(e @ (ImportCsvError::FileRequired | ImportCsvError::NotCsv)) => {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            },
            ReportApiError::Import(e @ (ImportCsvError::Upload(_) | ImportCsvError::Parse(_))) => {
                tracing::warn!("CSV upload rejected: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            },
            ReportApiError::Import(e @ (ImportCsvError::Store(_) | ImportCsvError::Queue(_))) => {
                tracing::error!("Failed to start CSV import: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to start CSV import")
            },
            ReportApiError::Summary(e @ MonthlySummaryError::MonthRequired) => {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            },
            ReportApiError::Summary(MonthlySummaryError::Store(e)) => {
                tracing::error!("Failed to build monthly summary: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load dashboard")
            },
        }
    }
}
