//! Jobs feature module
//!
//! Read-only access to import job progress. Clients poll it after an upload
//! until the job reaches `completed` or `failed`.

pub mod queries;
pub mod routes;

pub use routes::jobs_routes;
