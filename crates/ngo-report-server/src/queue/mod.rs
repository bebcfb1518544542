//! Submission queue between the upload endpoint and the import worker
//!
//! Delivery is at-least-once: a message handed out by [`SubmissionQueue::dequeue`]
//! stays leased until it is acknowledged. A lease that expires, or an explicit
//! [`SubmissionQueue::nack`], makes the message visible again, so consumers
//! must tolerate seeing the same batch twice. Giving up on a message that
//! keeps failing is the consumer's call, based on [`Delivery::attempt`].

use async_trait::async_trait;
use ngo_report_common::types::ImportBatch;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryQueue;
pub use postgres::PgQueue;

/// Queue failures
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unknown delivery: {0}")]
    UnknownDelivery(i64),
}

pub type QueueResult<T> = Result<T, QueueError>;

/// A leased message.
///
/// The payload is kept as raw JSON; decoding it into an [`ImportBatch`] is the
/// consumer's job so that a malformed message can be told apart from a
/// transport failure.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: i64,
    /// 1 on first delivery, incremented on every redelivery
    pub attempt: i32,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait SubmissionQueue: Send + Sync {
    /// Durably record a batch. Returns the message id.
    async fn enqueue(&self, batch: &ImportBatch) -> QueueResult<i64>;

    /// Lease the oldest visible message, if any. Never blocks waiting for work.
    async fn dequeue(&self) -> QueueResult<Option<Delivery>>;

    /// Remove a leased message for good
    async fn ack(&self, delivery_id: i64) -> QueueResult<()>;

    /// Release a lease; the message becomes visible again after `retry_after`
    async fn nack(&self, delivery_id: i64, retry_after: Duration) -> QueueResult<()>;
}

pub type SharedQueue = Arc<dyn SubmissionQueue>;
