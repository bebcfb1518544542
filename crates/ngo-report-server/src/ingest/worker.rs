//! Import worker
//!
//! Consumes [`ImportBatch`] messages from the submission queue and applies them
//! to the report store, keeping the matching [`ImportJob`] up to date.
//!
//! A batch is processed sequentially. Row-level problems (missing key fields,
//! a failed upsert) are tallied on the job and never abort the batch; only a
//! payload whose rows cannot be decoded at all fails the job.
//!
//! Delivery is at-least-once, so every delivery recomputes the counters from
//! scratch. A redelivered batch whose job already reached a terminal state is
//! acknowledged without touching the job; the job store refuses writes to a
//! finished job, so a worker whose lease expired mid-batch stops as soon as
//! another worker finishes the job.
//!
//! A batch that keeps failing is released with a growing delay and given up
//! after `max_attempts` deliveries, failing its job when the job can be loaded.

use ngo_report_common::{
    types::{ImportBatch, JobStatus, RowError, RowErrors},
    ReportError,
};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::normalizer::{normalize_row, RowOutcome};
use crate::config::WorkerConfig;
use crate::models::ImportJob;
use crate::queue::{Delivery, QueueError, SharedQueue};
use crate::storage::{SharedJobStore, SharedReportStore, StoreError};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Job error: {0}")]
    Job(#[from] ReportError),
}

/// What happened to one delivered batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Payload carried no usable job id
    Unidentified,
    /// The referenced job does not exist
    JobNotFound(Uuid),
    /// The job was already `completed` or `failed`
    AlreadyFinished { job_id: Uuid, status: JobStatus },
    Completed {
        job_id: Uuid,
        processed_rows: i64,
        failed_rows: i64,
    },
    Failed { job_id: Uuid, reason: String },
    /// Every allowed delivery failed; the message was dropped
    Abandoned {
        job_id: Option<Uuid>,
        attempts: i32,
        reason: String,
    },
}

pub struct ImportWorker {
    jobs: SharedJobStore,
    reports: SharedReportStore,
    queue: SharedQueue,
    poll_interval: Duration,
    progress_interval: usize,
    max_attempts: i32,
    retry_backoff: Duration,
}

impl ImportWorker {
    pub fn new(
        jobs: SharedJobStore,
        reports: SharedReportStore,
        queue: SharedQueue,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            jobs,
            reports,
            queue,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            progress_interval: config.progress_interval.max(1),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Spawn the polling loop; it exits once `shutdown` is cancelled
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                poll_interval_ms = self.poll_interval.as_millis() as u64,
                progress_interval = self.progress_interval,
                max_attempts = self.max_attempts,
                "Import worker started"
            );
            self.run(shutdown).await;
            info!("Import worker stopped");
        })
    }

    /// Poll the queue until `shutdown` is cancelled.
    ///
    /// A batch already being processed is finished before the loop exits.
    pub async fn run(&self, shutdown: CancellationToken) {
        while !shutdown.is_cancelled() {
            let idle = match self.poll_once().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    error!("Import worker poll failed: {}", e);
                    true
                },
            };

            if idle {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {},
                }
            }
        }
    }

    /// Process batches until the queue has nothing visible left
    pub async fn run_until_idle(&self) -> Result<Vec<BatchOutcome>, WorkerError> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.poll_once().await? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Lease and process at most one batch
    pub async fn poll_once(&self) -> Result<Option<BatchOutcome>, WorkerError> {
        match self.queue.dequeue().await? {
            Some(delivery) => self.process_delivery(delivery).await.map(Some),
            None => Ok(None),
        }
    }

    /// Process one delivery and settle it with the queue.
    ///
    /// Every outcome is acknowledged. Store failures outside the per-row
    /// upserts release the lease with a delay so the batch is retried, until
    /// the delivery reaches `max_attempts`.
    pub async fn process_delivery(&self, delivery: Delivery) -> Result<BatchOutcome, WorkerError> {
        debug!(delivery_id = delivery.id, attempt = delivery.attempt, "Batch delivered");

        match self.process_batch(&delivery.payload).await {
            Ok(outcome) => {
                log_outcome(delivery.id, &outcome);
                self.settle(delivery.id).await?;
                Ok(outcome)
            },
            Err(e) if delivery.attempt >= self.max_attempts => {
                let job_id = payload_job_id(&delivery.payload);
                if let Some(job_id) = job_id {
                    self.abandon_job(job_id).await;
                }

                let outcome = BatchOutcome::Abandoned {
                    job_id,
                    attempts: delivery.attempt,
                    reason: e.to_string(),
                };
                log_outcome(delivery.id, &outcome);
                self.settle(delivery.id).await?;
                Ok(outcome)
            },
            Err(e) => {
                let retry_after = self.retry_backoff * delivery.attempt.max(1).unsigned_abs();
                error!(
                    delivery_id = delivery.id,
                    attempt = delivery.attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Batch processing interrupted: {}",
                    e
                );
                if let Err(nack_err) = self.queue.nack(delivery.id, retry_after).await {
                    warn!(delivery_id = delivery.id, "Failed to release batch: {}", nack_err);
                }
                Err(e)
            },
        }
    }

    /// Acknowledge a delivery. A lease that expired and was already settled by
    /// another worker is not an error.
    async fn settle(&self, delivery_id: i64) -> Result<(), WorkerError> {
        match self.queue.ack(delivery_id).await {
            Err(QueueError::UnknownDelivery(_)) => {
                warn!(delivery_id, "Lease lost before ack; batch was settled by another worker");
                Ok(())
            },
            other => other.map_err(WorkerError::from),
        }
    }

    /// Mark the job of a dropped batch as failed, if it can still be reached
    async fn abandon_job(&self, job_id: Uuid) {
        let mut job = match self.jobs.find_job(job_id).await {
            Ok(Some(job)) if !job.status.is_terminal() => job,
            Ok(_) => return,
            Err(e) => {
                warn!(%job_id, "Could not load job of abandoned batch: {}", e);
                return;
            },
        };

        if let Err(e) = job.fail() {
            warn!(%job_id, "Could not fail job of abandoned batch: {}", e);
            return;
        }
        if let Err(e) = self.jobs.save_job(&job).await {
            warn!(%job_id, "Could not fail job of abandoned batch: {}", e);
        }
    }

    /// Apply one queue payload to the stores
    pub async fn process_batch(&self, payload: &Value) -> Result<BatchOutcome, WorkerError> {
        let Some(job_id) = payload_job_id(payload) else {
            return Ok(BatchOutcome::Unidentified);
        };

        let Some(job) = self.jobs.find_job(job_id).await? else {
            return Ok(BatchOutcome::JobNotFound(job_id));
        };

        if job.status.is_terminal() {
            return Ok(BatchOutcome::AlreadyFinished {
                job_id,
                status: job.status,
            });
        }

        match self.run_job(job, payload).await {
            Err(WorkerError::Store(StoreError::JobFinished { id, status })) => {
                Ok(BatchOutcome::AlreadyFinished { job_id: id, status })
            },
            other => other,
        }
    }

    async fn run_job(&self, mut job: ImportJob, payload: &Value) -> Result<BatchOutcome, WorkerError> {
        let job_id = job.id;

        job.start_processing()?;
        self.jobs.save_job(&job).await?;

        let batch = match serde_json::from_value::<ImportBatch>(payload.clone()) {
            Ok(batch) => batch,
            Err(e) => {
                let reason = format!("Malformed batch: {}", e);
                job.fail()?;
                self.jobs.save_job(&job).await?;
                return Ok(BatchOutcome::Failed { job_id, reason });
            },
        };

        let tally = self.apply_rows(&mut job, &batch).await?;

        job.complete(tally.processed, tally.failed, tally.errors)?;
        self.jobs.save_job(&job).await?;

        Ok(BatchOutcome::Completed {
            job_id,
            processed_rows: job.processed_rows,
            failed_rows: job.failed_rows,
        })
    }

    async fn apply_rows(
        &self,
        job: &mut ImportJob,
        batch: &ImportBatch,
    ) -> Result<RowTally, WorkerError> {
        let mut tally = RowTally::default();
        let total = batch.rows.len();

        for (index, row) in batch.rows.iter().enumerate() {
            let row_number = index + 1;

            match normalize_row(row_number, row) {
                RowOutcome::Accepted(fact) => match self.reports.upsert_report(&fact).await {
                    Ok(()) => tally.processed += 1,
                    Err(e) => {
                        warn!(
                            job_id = %job.id,
                            row_number,
                            ngo_id = %fact.ngo_id,
                            month = %fact.month,
                            "Row upsert failed: {}",
                            e
                        );
                        tally.reject(RowError::new(row_number, e.to_string()));
                    },
                },
                RowOutcome::Rejected(row_error) => tally.reject(row_error),
            }

            if row_number % self.progress_interval == 0 && row_number < total {
                job.record_progress(tally.processed, tally.failed, &tally.errors);
                match self.jobs.save_job(job).await {
                    Ok(()) => {},
                    Err(e @ StoreError::JobFinished { .. }) => return Err(e.into()),
                    Err(e) => {
                        warn!(job_id = %job.id, row_number, "Failed to persist progress: {}", e);
                    },
                }
            }
        }

        Ok(tally)
    }
}

#[derive(Default)]
struct RowTally {
    processed: i64,
    failed: i64,
    errors: RowErrors,
}

impl RowTally {
    fn reject(&mut self, error: RowError) {
        self.failed += 1;
        self.errors.push(error);
    }
}

fn payload_job_id(payload: &Value) -> Option<Uuid> {
    payload
        .get("jobId")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
}

fn log_outcome(delivery_id: i64, outcome: &BatchOutcome) {
    match outcome {
        BatchOutcome::Unidentified => {
            warn!(delivery_id, "Dropping batch without a job id");
        },
        BatchOutcome::JobNotFound(job_id) => {
            debug!(delivery_id, %job_id, "Dropping batch for unknown job");
        },
        BatchOutcome::AlreadyFinished { job_id, status } => {
            info!(delivery_id, %job_id, %status, "Skipping redelivered batch for finished job");
        },
        BatchOutcome::Completed {
            job_id,
            processed_rows,
            failed_rows,
        } => {
            info!(delivery_id, %job_id, processed_rows, failed_rows, "Import job completed");
        },
        BatchOutcome::Failed { job_id, reason } => {
            error!(delivery_id, %job_id, "Import job failed: {}", reason);
        },
        BatchOutcome::Abandoned {
            job_id,
            attempts,
            reason,
        } => {
            error!(
                delivery_id,
                job_id = ?job_id,
                attempts,
                "Giving up on batch: {}",
                reason
            );
        },
    }
}
