//! PostgreSQL store and queue tests
//!
//! Each test gets a fresh database with the migrations applied. They need a
//! reachable server in `DATABASE_URL`:
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/ngo_reports cargo test --test postgres_tests -- --ignored
//! ```

use ngo_report_common::types::{ImportBatch, JobStatus, RawRow, ReportFact, RowError, RowErrors};
use ngo_report_server::{
    models::ImportJob,
    queue::{PgQueue, SubmissionQueue},
    storage::{JobStore, PgJobStore, PgReportStore, ReportStore, StoreError},
};
use sqlx::PgPool;
use std::time::Duration;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_report_upsert_replaces_by_key(pool: PgPool) {
    let store = PgReportStore::new(pool);

    store
        .upsert_report(&ReportFact::new("NGO-001", "2025-01").with_metrics(100, 2, 50.0))
        .await
        .unwrap();
    store
        .upsert_report(&ReportFact::new("NGO-001", "2025-01").with_metrics(200, 3, 75.25))
        .await
        .unwrap();

    let stored = store.get_report("NGO-001", "2025-01").await.unwrap().unwrap();
    assert_eq!(stored.people_helped, 200);
    assert_eq!(stored.events_conducted, 3);
    assert_eq!(stored.funds_utilized, 75.25);

    let summary = store.monthly_summary("2025-01").await.unwrap();
    assert_eq!(summary.total_ngos, 1);
    assert_eq!(summary.total_people_helped, 200);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_monthly_summary_totals(pool: PgPool) {
    let store = PgReportStore::new(pool);

    for fact in [
        ReportFact::new("NGO-001", "2025-01").with_metrics(10, 1, 100.0),
        ReportFact::new("NGO-002", "2025-01").with_metrics(20, 2, 250.5),
        ReportFact::new("NGO-003", "2025-02").with_metrics(99, 9, 999.0),
    ] {
        store.upsert_report(&fact).await.unwrap();
    }

    let summary = store.monthly_summary("2025-01").await.unwrap();
    assert_eq!(summary.total_ngos, 2);
    assert_eq!(summary.total_people_helped, 30);
    assert_eq!(summary.total_events, 3);
    assert_eq!(summary.total_funds, 350.5);

    let empty = store.monthly_summary("2031-01").await.unwrap();
    assert_eq!(empty, Default::default());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_job_lifecycle_round_trip(pool: PgPool) {
    let store = PgJobStore::new(pool);

    let mut job = ImportJob::new(Some(3));
    store.insert_job(&job).await.unwrap();

    let loaded = store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Pending);
    assert_eq!(loaded.total_rows, Some(3));
    assert!(loaded.errors.is_empty());

    job.start_processing().unwrap();
    store.save_job(&job).await.unwrap();

    let errors = RowErrors::from(vec![RowError::new(2, "ngoId or month missing")]);
    job.complete(2, 1, errors.clone()).unwrap();
    store.save_job(&job).await.unwrap();

    let loaded = store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Completed);
    assert_eq!(loaded.processed_rows, 2);
    assert_eq!(loaded.failed_rows, 1);
    assert_eq!(loaded.errors, errors);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_finished_job_rejects_later_saves(pool: PgPool) {
    let store = PgJobStore::new(pool);

    let mut job = ImportJob::new(Some(1));
    store.insert_job(&job).await.unwrap();
    job.start_processing().unwrap();
    let stale = job.clone();

    job.complete(1, 0, RowErrors::new()).unwrap();
    store.save_job(&job).await.unwrap();

    let result = store.save_job(&stale).await;
    assert!(matches!(
        result,
        Err(StoreError::JobFinished { status: JobStatus::Completed, .. })
    ));

    let loaded = store.find_job(job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Completed);
    assert_eq!(loaded.processed_rows, 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_find_missing_job(pool: PgPool) {
    let store = PgJobStore::new(pool);

    assert!(store.find_job(uuid::Uuid::new_v4()).await.unwrap().is_none());
}

fn batch() -> ImportBatch {
    ImportBatch {
        job_id: uuid::Uuid::new_v4(),
        rows: vec![RawRow::from_record([("ngoId", "NGO-001"), ("month", "2025-01")])],
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_queue_leases_each_message_once(pool: PgPool) {
    let queue = PgQueue::new(pool, Duration::from_secs(300));

    let sent = batch();
    let id = queue.enqueue(&sent).await.unwrap();

    let delivery = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(delivery.id, id);
    assert_eq!(delivery.attempt, 1);
    assert_eq!(delivery.payload["jobId"], sent.job_id.to_string());

    assert!(queue.dequeue().await.unwrap().is_none());

    queue.ack(delivery.id).await.unwrap();
    assert!(queue.dequeue().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_queue_nack_redelivers(pool: PgPool) {
    let queue = PgQueue::new(pool, Duration::from_secs(300));

    queue.enqueue(&batch()).await.unwrap();

    let first = queue.dequeue().await.unwrap().unwrap();
    queue.nack(first.id, Duration::ZERO).await.unwrap();

    let second = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.attempt, 2);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_queue_nack_delay_lets_later_messages_through(pool: PgPool) {
    let queue = PgQueue::new(pool, Duration::from_secs(300));

    let stuck = queue.enqueue(&batch()).await.unwrap();
    let next = queue.enqueue(&batch()).await.unwrap();

    let first = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(first.id, stuck);
    queue.nack(first.id, Duration::from_secs(60)).await.unwrap();

    let second = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(second.id, next);
    queue.ack(second.id).await.unwrap();

    assert!(queue.dequeue().await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_queue_expired_lease_redelivers(pool: PgPool) {
    let queue = PgQueue::new(pool, Duration::from_millis(50));

    queue.enqueue(&batch()).await.unwrap();
    let first = queue.dequeue().await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
}
