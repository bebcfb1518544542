//! Submit report command
//!
//! Direct, single-record create-or-replace of one NGO's monthly report.

use mediator::Request;
use ngo_report_common::types::ReportFact;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ingest::normalizer::{parse_amount, parse_count};
use crate::storage::{SharedReportStore, StoreError};

pub const SUBMITTED_MESSAGE: &str = "Report submitted successfully";

/// Command to create or replace the report for `(ngo_id, month)`.
///
/// Metrics accept JSON numbers or numeric strings and are coerced the same
/// way as CSV cells: anything absent, negative or non-numeric is stored as 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportCommand {
    #[serde(default)]
    pub ngo_id: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub people_helped: Option<Value>,
    #[serde(default)]
    pub events_conducted: Option<Value>,
    #[serde(default)]
    pub funds_utilized: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReportResponse {
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitReportError {
    #[error("ngoId and month required")]
    MissingKeyFields,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<SubmitReportResponse, SubmitReportError>> for SubmitReportCommand {}

impl crate::cqrs::Command for SubmitReportCommand {}

impl SubmitReportCommand {
    /// Validate and convert into the fact to store
    pub fn into_fact(self) -> Result<ReportFact, SubmitReportError> {
        let ngo_id = self.ngo_id.trim();
        let month = self.month.trim();
        if ngo_id.is_empty() || month.is_empty() {
            return Err(SubmitReportError::MissingKeyFields);
        }

        Ok(ReportFact::new(ngo_id, month).with_metrics(
            parse_count(metric_text(self.people_helped.as_ref()).as_deref()),
            parse_count(metric_text(self.events_conducted.as_ref()).as_deref()),
            parse_amount(metric_text(self.funds_utilized.as_ref()).as_deref()),
        ))
    }
}

/// Text of a JSON metric as it would appear in a CSV cell
fn metric_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

#[tracing::instrument(skip(reports, command), fields(ngo_id = %command.ngo_id, month = %command.month))]
pub async fn handle(
    reports: SharedReportStore,
    command: SubmitReportCommand,
) -> Result<SubmitReportResponse, SubmitReportError> {
    let fact = command.into_fact()?;

    reports.upsert_report(&fact).await?;

    tracing::info!(ngo_id = %fact.ngo_id, month = %fact.month, "Report submitted");

    Ok(SubmitReportResponse {
        message: SUBMITTED_MESSAGE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryReportStore, ReportStore};
    use serde_json::json;
    use std::sync::Arc;

    fn command(body: Value) -> SubmitReportCommand {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_into_fact_trims_keys() {
        let fact = command(json!({
            "ngoId": " NGO-001 ",
            "month": "2025-01",
            "peopleHelped": 120,
            "eventsConducted": "4",
            "fundsUtilized": 15000.5
        }))
        .into_fact()
        .unwrap();

        assert_eq!(fact, ReportFact::new("NGO-001", "2025-01").with_metrics(120, 4, 15000.5));
    }

    #[test]
    fn test_missing_metrics_default_to_zero() {
        let fact = command(json!({ "ngoId": "NGO-001", "month": "2025-01", "fundsUtilized": null }))
            .into_fact()
            .unwrap();

        assert_eq!(fact, ReportFact::new("NGO-001", "2025-01"));
    }

    #[test]
    fn test_missing_key_fields_rejected() {
        for body in [
            json!({ "month": "2025-01" }),
            json!({ "ngoId": "NGO-001" }),
            json!({ "ngoId": "  ", "month": "2025-01" }),
        ] {
            assert!(matches!(
                command(body).into_fact(),
                Err(SubmitReportError::MissingKeyFields)
            ));
        }
    }

    #[test]
    fn test_invalid_metrics_become_zero() {
        let fact = command(json!({
            "ngoId": "NGO-001",
            "month": "2025-01",
            "peopleHelped": -1,
            "eventsConducted": 2.5,
            "fundsUtilized": "lots"
        }))
        .into_fact()
        .unwrap();

        assert_eq!(fact, ReportFact::new("NGO-001", "2025-01"));

        let fact = command(json!({
            "ngoId": "NGO-001",
            "month": "2025-01",
            "peopleHelped": "12.0",
            "fundsUtilized": [1]
        }))
        .into_fact()
        .unwrap();

        assert_eq!(fact, ReportFact::new("NGO-001", "2025-01").with_metrics(12, 0, 0.0));
    }

    #[tokio::test]
    async fn test_handle_upserts_latest_values() {
        let store = Arc::new(InMemoryReportStore::new());

        for funds in [100, 200] {
            let response = handle(
                store.clone(),
                command(json!({ "ngoId": "NGO-001", "month": "2025-01", "fundsUtilized": funds })),
            )
            .await
            .unwrap();
            assert_eq!(response.message, SUBMITTED_MESSAGE);
        }

        let stored = store.get_report("NGO-001", "2025-01").await.unwrap().unwrap();
        assert_eq!(stored.funds_utilized, 200.0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_handle_surfaces_store_errors() {
        let store = Arc::new(InMemoryReportStore::new());
        store.fail_upserts_for("NGO-001").await;

        let result = handle(
            store,
            command(json!({ "ngoId": "NGO-001", "month": "2025-01" })),
        )
        .await;

        assert!(matches!(result, Err(SubmitReportError::Store(_))));
    }
}
