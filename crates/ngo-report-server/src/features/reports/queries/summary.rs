//! Monthly summary query
//!
//! Totals across every NGO for one reporting month.

use mediator::Request;
use ngo_report_common::types::MonthlySummary;
use serde::{Deserialize, Serialize};

use crate::storage::{SharedReportStore, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlySummaryQuery {
    /// `YYYY-MM`
    #[serde(default)]
    pub month: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MonthlySummaryError {
    #[error("month is required (YYYY-MM)")]
    MonthRequired,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<MonthlySummary, MonthlySummaryError>> for MonthlySummaryQuery {}

impl crate::cqrs::Query for MonthlySummaryQuery {}

impl MonthlySummaryQuery {
    pub fn month(&self) -> Result<&str, MonthlySummaryError> {
        self.month
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or(MonthlySummaryError::MonthRequired)
    }
}

#[tracing::instrument(skip(reports))]
pub async fn handle(
    reports: SharedReportStore,
    query: MonthlySummaryQuery,
) -> Result<MonthlySummary, MonthlySummaryError> {
    let month = query.month()?;
    Ok(reports.monthly_summary(month).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryReportStore, ReportStore};
    use ngo_report_common::types::ReportFact;
    use std::sync::Arc;

    fn query(month: Option<&str>) -> MonthlySummaryQuery {
        MonthlySummaryQuery {
            month: month.map(str::to_string),
        }
    }

    #[test]
    fn test_month_is_required() {
        assert!(matches!(query(None).month(), Err(MonthlySummaryError::MonthRequired)));
        assert!(matches!(query(Some("  ")).month(), Err(MonthlySummaryError::MonthRequired)));
        assert_eq!(query(Some(" 2025-01 ")).month().unwrap(), "2025-01");
    }

    #[tokio::test]
    async fn test_summary_for_month() {
        let store = Arc::new(InMemoryReportStore::new());
        store
            .upsert_report(&ReportFact::new("NGO-001", "2025-01").with_metrics(10, 1, 100.0))
            .await
            .unwrap();
        store
            .upsert_report(&ReportFact::new("NGO-002", "2025-01").with_metrics(5, 2, 50.5))
            .await
            .unwrap();

        let summary = handle(store, query(Some("2025-01"))).await.unwrap();

        assert_eq!(
            summary,
            MonthlySummary {
                total_ngos: 2,
                total_people_helped: 15,
                total_events: 3,
                total_funds: 150.5,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_month_is_all_zeros() {
        let store = Arc::new(InMemoryReportStore::new());
        let summary = handle(store, query(Some("1999-12"))).await.unwrap();
        assert_eq!(summary, MonthlySummary::default());
    }
}
