//! Report queries

pub mod summary;

pub use summary::{MonthlySummaryError, MonthlySummaryQuery};
