use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Headline figures recorded each time the dashboard is viewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshotCore {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub total_voters: u64,
    pub total_candidates: u64,
    pub total_positions: u64,
    pub active_elections: u64,
    pub completed_elections: u64,
    pub total_votes_cast: u64,
    /// Percentage of registered voters who have cast at least one vote.
    pub voter_turnout: f64,
}

/// A snapshot without an ID.
pub type NewAnalyticsSnapshot = AnalyticsSnapshotCore;

/// A snapshot from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub snapshot: AnalyticsSnapshotCore,
}

impl Deref for AnalyticsSnapshot {
    type Target = AnalyticsSnapshotCore;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}
