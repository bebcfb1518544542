//! Command/query split for feature slices
//!
//! Every request type implements [`mediator::Request`] with its handler's
//! result type and is tagged with exactly one of the marker traits below.
//! Commands change stored state (reports, import jobs, the queue); queries
//! only read it.

pub use mediator::Request;

/// Marker for requests that write
pub trait Command {}

/// Marker for read-only requests
pub trait Query {}
