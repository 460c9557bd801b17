//! Persistence layer: PostgreSQL event log and SOS record mirror.
//!
//! All writes are best-effort and happen off the request path; the
//! in-memory store remains the source of truth for reads and the
//! database is an audit mirror.

pub mod postgres;

pub use postgres::PostgresPersistence;
