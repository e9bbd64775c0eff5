//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Field names are snake_case.

pub mod admin;
pub mod analytics;
pub mod announcement;
pub mod candidate;
pub mod election;
pub mod position;
pub mod vote;
pub mod voter;
