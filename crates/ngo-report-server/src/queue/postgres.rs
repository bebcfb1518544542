//! Queue backed by the `import_queue` table.
//!
//! Claims use `FOR UPDATE SKIP LOCKED` so concurrent workers never lease the
//! same row, and a lease is just a `claimed_until` timestamp: once it passes,
//! the row is claimable again.

use async_trait::async_trait;
use ngo_report_common::types::ImportBatch;
use sqlx::PgPool;
use std::time::Duration;

use super::{Delivery, QueueError, QueueResult, SubmissionQueue};

#[derive(Clone)]
pub struct PgQueue {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PgQueue {
    pub fn new(pool: PgPool, visibility_timeout: Duration) -> Self {
        Self {
            pool,
            visibility_timeout,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ClaimedRow {
    id: i64,
    attempts: i32,
    payload: serde_json::Value,
}

#[async_trait]
impl SubmissionQueue for PgQueue {
    #[tracing::instrument(skip(self, batch), fields(job_id = %batch.job_id, rows = batch.rows.len()))]
    async fn enqueue(&self, batch: &ImportBatch) -> QueueResult<i64> {
        let payload = serde_json::to_value(batch)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO import_queue (payload)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn dequeue(&self) -> QueueResult<Option<Delivery>> {
        let row = sqlx::query_as::<_, ClaimedRow>(
            r#"
            WITH claimable AS (
                SELECT id
                FROM import_queue
                WHERE claimed_until IS NULL OR claimed_until <= NOW()
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE import_queue q
            SET claimed_until = NOW() + make_interval(secs => $1),
                attempts = q.attempts + 1
            FROM claimable c
            WHERE q.id = c.id
            RETURNING q.id, q.attempts, q.payload
            "#,
        )
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Delivery {
            id: r.id,
            attempt: r.attempts,
            payload: r.payload,
        }))
    }

    async fn ack(&self, delivery_id: i64) -> QueueResult<()> {
        let result = sqlx::query("DELETE FROM import_queue WHERE id = $1")
            .bind(delivery_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::UnknownDelivery(delivery_id));
        }
        Ok(())
    }

    async fn nack(&self, delivery_id: i64, retry_after: Duration) -> QueueResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE import_queue
            SET claimed_until = NOW() + make_interval(secs => $2)
            WHERE id = $1
            "#,
        )
        .bind(delivery_id)
        .bind(retry_after.as_secs_f64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::UnknownDelivery(delivery_id));
        }
        Ok(())
    }
}
