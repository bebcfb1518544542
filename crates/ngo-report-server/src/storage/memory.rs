//! In-memory stores for tests and local runs without PostgreSQL

use async_trait::async_trait;
use ngo_report_common::types::{MonthlySummary, ReportFact};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{JobStore, ReportStore, StoreError, StoreResult};
use crate::models::ImportJob;

/// Report facts in a map keyed by `(ngo_id, month)`.
///
/// Upserts for NGOs registered with [`fail_upserts_for`](Self::fail_upserts_for)
/// return [`StoreError::Unavailable`], which lets tests exercise per-row store
/// failures.
#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<BTreeMap<(String, String), ReportFact>>,
    failing_ngos: RwLock<HashSet<String>>,
    upsert_calls: AtomicUsize,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_upserts_for(&self, ngo_id: impl Into<String>) {
        self.failing_ngos.write().await.insert(ngo_id.into());
    }

    /// Number of upsert attempts, failed ones included
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn upsert_report(&self, fact: &ReportFact) -> StoreResult<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_ngos.read().await.contains(&fact.ngo_id) {
            return Err(StoreError::Unavailable(format!(
                "report store rejected write for {}",
                fact.ngo_id
            )));
        }

        self.reports
            .write()
            .await
            .insert((fact.ngo_id.clone(), fact.month.clone()), fact.clone());
        Ok(())
    }

    async fn get_report(&self, ngo_id: &str, month: &str) -> StoreResult<Option<ReportFact>> {
        Ok(self
            .reports
            .read()
            .await
            .get(&(ngo_id.to_string(), month.to_string()))
            .cloned())
    }

    async fn monthly_summary(&self, month: &str) -> StoreResult<MonthlySummary> {
        let reports = self.reports.read().await;
        let mut ngos = HashSet::new();
        let mut summary = MonthlySummary::default();

        for fact in reports.values().filter(|f| f.month == month) {
            ngos.insert(fact.ngo_id.as_str());
            summary.total_people_helped += fact.people_helped;
            summary.total_events += fact.events_conducted;
            summary.total_funds += fact.funds_utilized;
        }
        summary.total_ngos = ngos.len() as i64;

        Ok(summary)
    }
}

/// Import jobs in a map keyed by id.
///
/// [`set_unavailable`](Self::set_unavailable) makes every save fail, standing
/// in for a database outage.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<Uuid, ImportJob>>,
    unavailable: AtomicBool,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a job, simulating a record deleted while its batch is queued
    pub async fn remove_job(&self, id: Uuid) -> Option<ImportJob> {
        self.jobs.write().await.remove(&id)
    }

    /// Every stored job, in no particular order
    pub async fn list_jobs(&self) -> Vec<ImportJob> {
        self.jobs.read().await.values().cloned().collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_job(&self, job: &ImportJob) -> StoreResult<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<ImportJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn save_job(&self, job: &ImportJob) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("job store offline".to_string()));
        }

        match self.jobs.write().await.get_mut(&job.id) {
            Some(stored) if stored.status.is_terminal() => Err(StoreError::JobFinished {
                id: stored.id,
                status: stored.status,
            }),
            Some(stored) => {
                *stored = job.clone();
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("import job {} does not exist", job.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngo_report_common::types::JobStatus;

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = InMemoryReportStore::new();

        store
            .upsert_report(&ReportFact::new("NGO-001", "2025-01").with_metrics(10, 1, 100.0))
            .await
            .unwrap();
        store
            .upsert_report(&ReportFact::new("NGO-001", "2025-01").with_metrics(20, 2, 200.0))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let fact = store.get_report("NGO-001", "2025-01").await.unwrap().unwrap();
        assert_eq!(fact.funds_utilized, 200.0);
        assert_eq!(fact.people_helped, 20);
    }

    #[tokio::test]
    async fn test_failing_ngo_upsert_returns_error() {
        let store = InMemoryReportStore::new();
        store.fail_upserts_for("NGO-BAD").await;

        let result = store.upsert_report(&ReportFact::new("NGO-BAD", "2025-01")).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(store.is_empty().await);
        assert_eq!(store.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_monthly_summary_counts_distinct_ngos() {
        let store = InMemoryReportStore::new();
        for (ngo, month, people) in [
            ("NGO-001", "2025-01", 10),
            ("NGO-002", "2025-01", 5),
            ("NGO-001", "2025-02", 99),
        ] {
            store
                .upsert_report(&ReportFact::new(ngo, month).with_metrics(people, 1, 50.0))
                .await
                .unwrap();
        }

        let summary = store.monthly_summary("2025-01").await.unwrap();
        assert_eq!(summary.total_ngos, 2);
        assert_eq!(summary.total_people_helped, 15);
        assert_eq!(summary.total_events, 2);
        assert_eq!(summary.total_funds, 100.0);

        assert_eq!(store.monthly_summary("2024-12").await.unwrap(), MonthlySummary::default());
    }

    #[tokio::test]
    async fn test_job_round_trip() {
        let store = InMemoryJobStore::new();
        let mut job = ImportJob::new(Some(2));
        store.insert_job(&job).await.unwrap();

        job.start_processing().unwrap();
        store.save_job(&job).await.unwrap();

        let loaded = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert!(store.find_job(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_rejects_saves() {
        let store = InMemoryJobStore::new();
        let job = ImportJob::new(None);
        store.insert_job(&job).await.unwrap();

        store.set_unavailable(true);
        assert!(matches!(store.save_job(&job).await, Err(StoreError::Unavailable(_))));

        store.set_unavailable(false);
        assert!(store.save_job(&job).await.is_ok());
    }

    #[tokio::test]
    async fn test_finished_job_is_not_overwritten() {
        let store = InMemoryJobStore::new();
        let mut job = ImportJob::new(Some(1));
        store.insert_job(&job).await.unwrap();

        let mut stale = job.clone();
        stale.start_processing().unwrap();

        job.start_processing().unwrap();
        job.complete(1, 0, Default::default()).unwrap();
        store.save_job(&job).await.unwrap();

        let result = store.save_job(&stale).await;

        assert!(matches!(
            result,
            Err(StoreError::JobFinished { status: JobStatus::Completed, .. })
        ));
        let stored = store.find_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_save_unknown_job_fails() {
        let store = InMemoryJobStore::new();
        assert!(store.save_job(&ImportJob::new(None)).await.is_err());
    }
}
