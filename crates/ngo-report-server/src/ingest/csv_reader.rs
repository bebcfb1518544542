//! CSV decoding into raw rows
//!
//! The first record is the header. Every following record becomes a
//! [`RawRow`] keyed by the normalized header names; short records simply lack
//! the trailing fields and extra fields are ignored.

use ngo_report_common::types::RawRow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvReadError {
    #[error("Failed to open CSV file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),
}

/// Decode every data record of a CSV stream
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, CsvReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RawRow::from_record(headers.iter().zip(record.iter())));
    }

    Ok(rows)
}

/// Decode a CSV file on disk.
///
/// Blocking; async callers should run it on the blocking pool.
pub fn read_rows_from_path(path: &Path) -> Result<Vec<RawRow>, CsvReadError> {
    let file = File::open(path)?;
    read_rows(file)
}
