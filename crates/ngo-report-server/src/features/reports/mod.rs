//! Reports feature module
//!
//! Direct report submission, CSV bulk upload and the monthly dashboard
//! summary.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::reports_routes;
