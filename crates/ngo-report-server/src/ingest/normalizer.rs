//! Row normalization
//!
//! Turns one [`RawRow`] into a [`ReportFact`] or a row-level rejection. Only
//! the key fields can reject a row; metrics that are absent or not numeric
//! quietly become zero.

use ngo_report_common::types::{RawRow, ReportFact, RowError};

/// Rejection reason for rows without an NGO id or month
pub const MISSING_KEY_FIELDS: &str = "ngoId or month missing";

pub const FIELD_NGO_ID: &str = "ngoid";
pub const FIELD_MONTH: &str = "month";
pub const FIELD_PEOPLE_HELPED: &str = "peoplehelped";
pub const FIELD_EVENTS_CONDUCTED: &str = "eventsconducted";
pub const FIELD_FUNDS_UTILIZED: &str = "fundsutilized";

/// Outcome of normalizing one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(ReportFact),
    Rejected(RowError),
}

/// Normalize the row at 1-based position `row_number`
pub fn normalize_row(row_number: usize, row: &RawRow) -> RowOutcome {
    let ngo_id = key_field(row, FIELD_NGO_ID);
    let month = key_field(row, FIELD_MONTH);

    let (Some(ngo_id), Some(month)) = (ngo_id, month) else {
        return RowOutcome::Rejected(RowError::new(row_number, MISSING_KEY_FIELDS));
    };

    RowOutcome::Accepted(ReportFact::new(ngo_id, month).with_metrics(
        parse_count(row.get(FIELD_PEOPLE_HELPED)),
        parse_count(row.get(FIELD_EVENTS_CONDUCTED)),
        parse_amount(row.get(FIELD_FUNDS_UTILIZED)),
    ))
}

fn key_field<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    row.get(field).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n >= 0.0)
}

/// Non-negative whole number; `"12.0"` counts, `"12.5"` or `"-3"` is 0
pub fn parse_count(value: Option<&str>) -> i64 {
    parse_number(value)
        .filter(|n| n.fract() == 0.0 && *n <= i64::MAX as f64)
        .map(|n| n as i64)
        .unwrap_or(0)
}

/// Non-negative amount
pub fn parse_amount(value: Option<&str>) -> f64 {
    parse_number(value).unwrap_or(0.0)
}
