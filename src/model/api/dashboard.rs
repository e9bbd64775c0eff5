use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{api::id::ApiId, db::analytics::AnalyticsSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub voters: u64,
    /// Voters who have cast at least one vote.
    pub active_voters: u64,
    pub candidates: u64,
    pub positions: u64,
    pub votes: u64,
    pub turnout: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionCounts {
    pub total: u64,
    /// Ongoing and switched on.
    pub active: u64,
    pub upcoming: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVote {
    pub id: ApiId,
    pub voter: String,
    pub position: String,
    pub candidate: String,
    pub election: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPosition {
    pub id: ApiId,
    pub name: String,
    pub vote_count: u64,
}

/// Headline statistics for administrators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub totals: Totals,
    pub elections: ElectionCounts,
    pub recent_votes: Vec<RecentVote>,
    pub top_positions: Vec<TopPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDescription {
    pub date: DateTime<Utc>,
    pub total_voters: u64,
    pub total_candidates: u64,
    pub total_positions: u64,
    pub active_elections: u64,
    pub completed_elections: u64,
    pub total_votes_cast: u64,
    pub voter_turnout: f64,
}

impl From<AnalyticsSnapshot> for SnapshotDescription {
    fn from(snapshot: AnalyticsSnapshot) -> Self {
        let snapshot = snapshot.snapshot;
        Self {
            date: snapshot.date,
            total_voters: snapshot.total_voters,
            total_candidates: snapshot.total_candidates,
            total_positions: snapshot.total_positions,
            active_elections: snapshot.active_elections,
            completed_elections: snapshot.completed_elections,
            total_votes_cast: snapshot.total_votes_cast,
            voter_turnout: snapshot.voter_turnout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyVotes {
    pub date: NaiveDate,
    pub count: u64,
}

/// Dashboard history over a window of days.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub days: u32,
    pub snapshots: Vec<SnapshotDescription>,
    pub votes_per_day: Vec<DailyVotes>,
}
