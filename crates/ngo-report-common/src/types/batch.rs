//! Queue message types for bulk imports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Canonical form of a CSV header: BOM stripped, trimmed, lower-cased
pub fn normalize_field_name(name: &str) -> String {
    name.trim_start_matches(BYTE_ORDER_MARK)
        .trim()
        .to_lowercase()
}

/// One input record keyed by normalized field name.
///
/// Values are kept verbatim; trimming and numeric coercion happen when the
/// worker turns the row into a [`ReportFact`](super::ReportFact).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    /// Build a row from `(field name, value)` pairs.
    ///
    /// When two headers normalize to the same name the later column wins.
    pub fn from_record<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self(
            fields
                .into_iter()
                .map(|(name, value)| (normalize_field_name(name.as_ref()), value.into()))
                .collect(),
        )
    }

    /// Look up a field by its normalized name
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Queue payload: every row of one upload, addressed to one import job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub job_id: Uuid,
    pub rows: Vec<RawRow>,
}

impl ImportBatch {
    pub fn new(job_id: Uuid, rows: Vec<RawRow>) -> Self {
        Self { job_id, rows }
    }
}
