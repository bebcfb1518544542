//! Test helpers for report server integration tests
//!
//! Builds the full router over in-memory stores and queue, plus an import
//! worker wired to the same handles, so tests can drive an upload end to end
//! without PostgreSQL.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use ngo_report_server::{
    api::{self, AppState},
    config::{Config, WorkerConfig},
    features::FeatureState,
    ingest::ImportWorker,
    queue::InMemoryQueue,
    storage::{InMemoryJobStore, InMemoryReportStore},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const BOUNDARY: &str = "ngo-report-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub reports: Arc<InMemoryReportStore>,
    pub jobs: Arc<InMemoryJobStore>,
    pub queue: Arc<InMemoryQueue>,
    pub config: Config,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let reports = Arc::new(InMemoryReportStore::new());
        let jobs = Arc::new(InMemoryJobStore::new());
        let queue = Arc::new(InMemoryQueue::default());

        let state = AppState {
            features: FeatureState {
                reports: reports.clone(),
                jobs: jobs.clone(),
                queue: queue.clone(),
            },
            db: None,
        };
        let router = api::create_router(state, &config);

        Self {
            router,
            reports,
            jobs,
            queue,
            config,
        }
    }

    /// A worker sharing this app's stores and queue
    pub fn worker(&self) -> ImportWorker {
        self.worker_with(&self.config.worker)
    }

    pub fn worker_with(&self, config: &WorkerConfig) -> ImportWorker {
        ImportWorker::new(
            self.jobs.clone(),
            self.reports.clone(),
            self.queue.clone(),
            config,
        )
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(
            &self.router,
            Request::builder().uri(uri).body(Body::empty()).unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(
            &self.router,
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST a multipart form with one file field
    pub async fn upload(
        &self,
        field: &str,
        filename: &str,
        contents: impl AsRef<[u8]>,
    ) -> (StatusCode, Value) {
        send(
            &self.router,
            Request::builder()
                .method(Method::POST)
                .uri("/reports/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(field, filename, contents.as_ref())))
                .unwrap(),
        )
        .await
    }

    /// Upload a CSV and return the new job id
    pub async fn upload_csv(&self, contents: &str) -> String {
        let (status, body) = self.upload("file", "reports.csv", contents).await;
        assert_eq!(status, StatusCode::OK, "upload failed: {body}");
        body["jobId"].as_str().unwrap().to_string()
    }

    pub async fn job_status(&self, job_id: &str) -> (StatusCode, Value) {
        self.get(&format!("/job-status/{}", job_id)).await
    }
}

pub fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Send a request and decode the JSON response body (`Null` when empty)
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}
