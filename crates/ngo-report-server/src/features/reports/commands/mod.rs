//! Report commands

pub mod import_csv;
pub mod submit;

pub use import_csv::{ImportCsvCommand, ImportCsvError, ImportCsvResponse};
pub use submit::{SubmitReportCommand, SubmitReportError, SubmitReportResponse};
