//! Common types shared by the upload path and the import worker

pub mod batch;
pub mod job;
pub mod report;

pub use batch::{ImportBatch, RawRow};
pub use job::{JobStatus, RowError, RowErrors, MAX_ROW_ERRORS};
pub use report::{MonthlySummary, ReportFact};
