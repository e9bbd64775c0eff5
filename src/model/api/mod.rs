//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//! - Field names are camelCase.

pub mod admin;
pub mod announcement;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod election;
pub mod envelope;
pub mod id;
pub mod pagination;
pub mod vote;
pub mod voter;
