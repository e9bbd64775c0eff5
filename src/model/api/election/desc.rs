use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{
        announcement::AnnouncementDescription,
        catalog::{CandidateDescription, PositionDescription},
        id::ApiId,
        pagination::PaginationResult,
    },
    common::election::{ElectionStatus, ResultsVisibility},
    db::election::{Election, ElectionSettingsCore},
};

/// The election's own fields, with the status recomputed for the time of viewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionView {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ElectionStatus,
    pub is_active: bool,
}

impl ElectionView {
    pub fn new(election: &Election, now: DateTime<Utc>) -> Self {
        Self {
            id: election.id.into(),
            title: election.title.clone(),
            description: election.description.clone(),
            start_date: election.start_date,
            end_date: election.end_date,
            status: election.status_at(now),
            is_active: election.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDescription {
    pub allow_multiple_votes: bool,
    pub results_visibility: ResultsVisibility,
    pub require_verification: bool,
    pub allow_abstention: bool,
}

impl From<&ElectionSettingsCore> for SettingsDescription {
    fn from(settings: &ElectionSettingsCore) -> Self {
        Self {
            allow_multiple_votes: settings.allow_multiple_votes,
            results_visibility: settings.results_visibility,
            require_verification: settings.require_verification,
            allow_abstention: settings.allow_abstention,
        }
    }
}

/// An election as shown in listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    #[serde(flatten)]
    pub election: ElectionView,
    pub settings: Option<SettingsDescription>,
    pub positions: Vec<PositionDescription>,
    pub vote_count: u64,
}

/// A page of elections.
#[derive(Debug, Serialize)]
pub struct ElectionListing {
    pub elections: Vec<ElectionSummary>,
    pub pagination: PaginationResult,
}

/// A position contested in an election, with its candidates.
#[derive(Debug, Serialize)]
pub struct PositionWithCandidates {
    #[serde(flatten)]
    pub position: PositionDescription,
    pub candidates: Vec<CandidateDescription>,
}

/// Everything about a single election.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    #[serde(flatten)]
    pub election: ElectionView,
    pub settings: Option<SettingsDescription>,
    pub positions: Vec<PositionWithCandidates>,
    pub announcements: Vec<AnnouncementDescription>,
    pub vote_count: u64,
}

/// Filters for listing elections.
#[derive(Debug, Default, FromForm)]
pub struct ElectionQuery {
    pub status: Option<ElectionStatus>,
    pub active: Option<bool>,
    pub search: Option<String>,
}
