use serde::Serialize;

use crate::model::api::{election::ElectionView, id::ApiId};

/// An entity referred to by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedRef {
    pub id: ApiId,
    pub name: String,
}

/// Votes received by one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate: NamedRef,
    pub vote_count: u64,
    /// Share of the position's votes, rounded to two decimals.
    pub percentage: f64,
}

/// Votes for one position, candidates ordered by descending votes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionTally {
    pub position: NamedRef,
    pub candidates: Vec<CandidateTally>,
    pub total_votes_for_position: u64,
}

/// Vote counts, optionally scoped to one election.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyReport {
    pub election: Option<ElectionView>,
    pub total_votes: u64,
    pub positions: Vec<PositionTally>,
}

/// The full results of an election.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election: ElectionView,
    pub total_votes: u64,
    pub eligible_voters: u64,
    pub unique_voters: u64,
    pub turnout: f64,
    pub positions: Vec<PositionTally>,
}
