//! CSV bulk import
//!
//! - **csv_reader**: decodes an uploaded CSV file into raw rows
//! - **normalizer**: turns one raw row into a report fact or a row error
//! - **worker**: drains the submission queue and drives import jobs to a
//!   terminal state

pub mod csv_reader;
pub mod normalizer;
pub mod worker;

pub use csv_reader::{read_rows, read_rows_from_path, CsvReadError};
pub use normalizer::{normalize_row, RowOutcome, MISSING_KEY_FIELDS};
pub use worker::{BatchOutcome, ImportWorker, WorkerError};
