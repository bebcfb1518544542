//! In-process queue with lease-based redelivery

use async_trait::async_trait;
use ngo_report_common::types::ImportBatch;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{Delivery, QueueError, QueueResult, SubmissionQueue};

struct Message {
    id: i64,
    attempts: i32,
    payload: serde_json::Value,
}

struct Leased {
    message: Message,
    expires_at: Instant,
}

#[derive(Default)]
struct State {
    next_id: i64,
    ready: VecDeque<Message>,
    leased: BTreeMap<i64, Leased>,
}

impl State {
    /// Return expired leases to the front of the queue, oldest id first
    fn reclaim_expired(&mut self, now: Instant) {
        let expired: Vec<i64> = self
            .leased
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired.into_iter().rev() {
            if let Some(lease) = self.leased.remove(&id) {
                self.ready.push_front(lease.message);
            }
        }
    }
}

/// Queue held in memory; used by tests and single-process development runs
pub struct InMemoryQueue {
    state: Mutex<State>,
    visibility_timeout: Duration,
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            visibility_timeout,
        }
    }

    /// Enqueue an arbitrary payload, bypassing batch encoding
    pub async fn push_raw(&self, payload: serde_json::Value) -> i64 {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        state.ready.push_back(Message {
            id,
            attempts: 0,
            payload,
        });
        id
    }

    /// Messages waiting to be leased
    pub async fn ready_len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Messages leased but not yet acknowledged
    pub async fn leased_len(&self) -> usize {
        self.state.lock().await.leased.len()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::DEFAULT_WORKER_VISIBILITY_TIMEOUT_SECS))
    }
}

#[async_trait]
impl SubmissionQueue for InMemoryQueue {
    async fn enqueue(&self, batch: &ImportBatch) -> QueueResult<i64> {
        let payload = serde_json::to_value(batch)?;
        Ok(self.push_raw(payload).await)
    }

    async fn dequeue(&self) -> QueueResult<Option<Delivery>> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.reclaim_expired(now);

        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };
        message.attempts += 1;

        let delivery = Delivery {
            id: message.id,
            attempt: message.attempts,
            payload: message.payload.clone(),
        };
        state.leased.insert(
            message.id,
            Leased {
                message,
                expires_at: now + self.visibility_timeout,
            },
        );

        Ok(Some(delivery))
    }

    async fn ack(&self, delivery_id: i64) -> QueueResult<()> {
        self.state
            .lock()
            .await
            .leased
            .remove(&delivery_id)
            .map(|_| ())
            .ok_or(QueueError::UnknownDelivery(delivery_id))
    }

    async fn nack(&self, delivery_id: i64, retry_after: Duration) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        let lease = state
            .leased
            .get_mut(&delivery_id)
            .ok_or(QueueError::UnknownDelivery(delivery_id))?;
        lease.expires_at = Instant::now() + retry_after;
        Ok(())
    }
}
