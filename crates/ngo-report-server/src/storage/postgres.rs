//! PostgreSQL-backed stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ngo_report_common::types::{JobStatus, MonthlySummary, ReportFact, RowError, RowErrors};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{JobStore, ReportStore, StoreError, StoreResult};
use crate::models::ImportJob;

/// Report facts in the `reports` table
#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRecord {
    ngo_id: String,
    month: String,
    people_helped: i64,
    events_conducted: i64,
    funds_utilized: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRecord {
    total_ngos: i64,
    total_people_helped: i64,
    total_events: i64,
    total_funds: f64,
}

#[async_trait]
impl ReportStore for PgReportStore {
    #[tracing::instrument(skip(self, fact), fields(ngo_id = %fact.ngo_id, month = %fact.month))]
    async fn upsert_report(&self, fact: &ReportFact) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reports (ngo_id, month, people_helped, events_conducted, funds_utilized)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ngo_id, month) DO UPDATE
            SET people_helped = EXCLUDED.people_helped,
                events_conducted = EXCLUDED.events_conducted,
                funds_utilized = EXCLUDED.funds_utilized,
                updated_at = NOW()
            "#,
        )
        .bind(&fact.ngo_id)
        .bind(&fact.month)
        .bind(fact.people_helped)
        .bind(fact.events_conducted)
        .bind(fact.funds_utilized)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_report(&self, ngo_id: &str, month: &str) -> StoreResult<Option<ReportFact>> {
        let record = sqlx::query_as::<_, ReportRecord>(
            r#"
            SELECT ngo_id, month, people_helped, events_conducted, funds_utilized
            FROM reports
            WHERE ngo_id = $1 AND month = $2
            "#,
        )
        .bind(ngo_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|r| {
            ReportFact::new(r.ngo_id, r.month).with_metrics(
                r.people_helped,
                r.events_conducted,
                r.funds_utilized,
            )
        }))
    }

    async fn monthly_summary(&self, month: &str) -> StoreResult<MonthlySummary> {
        let record = sqlx::query_as::<_, SummaryRecord>(
            r#"
            SELECT COUNT(DISTINCT ngo_id)::BIGINT AS total_ngos,
                   COALESCE(SUM(people_helped), 0)::BIGINT AS total_people_helped,
                   COALESCE(SUM(events_conducted), 0)::BIGINT AS total_events,
                   COALESCE(SUM(funds_utilized), 0)::DOUBLE PRECISION AS total_funds
            FROM reports
            WHERE month = $1
            "#,
        )
        .bind(month)
        .fetch_one(&self.pool)
        .await?;

        Ok(MonthlySummary {
            total_ngos: record.total_ngos,
            total_people_helped: record.total_people_helped,
            total_events: record.total_events,
            total_funds: record.total_funds,
        })
    }
}

/// Import jobs in the `import_jobs` table
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRecord {
    id: Uuid,
    status: String,
    total_rows: Option<i64>,
    processed_rows: i64,
    failed_rows: i64,
    errors: Json<Vec<RowError>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRecord> for ImportJob {
    type Error = StoreError;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        let status: JobStatus = record
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("import job {}: {}", record.id, e)))?;

        Ok(ImportJob {
            id: record.id,
            status,
            total_rows: record.total_rows,
            processed_rows: record.processed_rows,
            failed_rows: record.failed_rows,
            errors: RowErrors::from(record.errors.0),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id))]
    async fn insert_job(&self, job: &ImportJob) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO import_jobs (
                id, status, total_rows, processed_rows, failed_rows, errors, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(job.failed_rows)
        .bind(Json(job.errors.as_slice()))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<ImportJob>> {
        let record = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT id, status, total_rows, processed_rows, failed_rows, errors,
                   created_at, updated_at
            FROM import_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(ImportJob::try_from).transpose()
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, status = %job.status))]
    async fn save_job(&self, job: &ImportJob) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $2,
                total_rows = $3,
                processed_rows = $4,
                failed_rows = $5,
                errors = $6,
                updated_at = $7
            WHERE id = $1
              AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.total_rows)
        .bind(job.processed_rows)
        .bind(job.failed_rows)
        .bind(Json(job.errors.as_slice()))
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM import_jobs WHERE id = $1")
                .bind(job.id)
                .fetch_optional(&self.pool)
                .await?;

        match status {
            Some(status) => {
                let status = status
                    .parse::<JobStatus>()
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Err(StoreError::JobFinished { id: job.id, status })
            },
            None => Err(StoreError::Corrupt(format!("import job {} does not exist", job.id))),
        }
    }
}
