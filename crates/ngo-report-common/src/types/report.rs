//! Report facts

use serde::{Deserialize, Serialize};

/// Monthly metrics reported by one NGO.
///
/// Identified by `(ngo_id, month)`; storage keeps at most one fact per key and
/// a second write for the same key replaces all three metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFact {
    pub ngo_id: String,
    /// Reporting month, `YYYY-MM`
    pub month: String,
    pub people_helped: i64,
    pub events_conducted: i64,
    pub funds_utilized: f64,
}

impl ReportFact {
    pub fn new(ngo_id: impl Into<String>, month: impl Into<String>) -> Self {
        Self {
            ngo_id: ngo_id.into(),
            month: month.into(),
            people_helped: 0,
            events_conducted: 0,
            funds_utilized: 0.0,
        }
    }

    pub fn with_metrics(mut self, people_helped: i64, events_conducted: i64, funds_utilized: f64) -> Self {
        self.people_helped = people_helped;
        self.events_conducted = events_conducted;
        self.funds_utilized = funds_utilized;
        self
    }
}

/// Aggregate totals for one month across all NGOs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    #[serde(rename = "totalNGOs")]
    pub total_ngos: i64,
    pub total_people_helped: i64,
    pub total_events: i64,
    pub total_funds: f64,
}
