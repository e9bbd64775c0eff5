use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single recorded choice of a candidate for a position. Votes are never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub voter_id: Id,
    pub position_id: Id,
    pub candidate_id: Id,
    /// `None` for votes cast outside any election.
    pub election_id: Option<Id>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    /// Present only when the election allows one vote per position. Covered by
    /// a unique sparse index, so must be omitted rather than null when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_key: Option<String>,
}

impl VoteCore {
    /// Create a vote cast now. If `exclusive`, the vote claims the voter's single
    /// slot for this position in its election.
    pub fn new(
        voter_id: Id,
        position_id: Id,
        candidate_id: Id,
        election_id: Option<Id>,
        exclusive: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let exclusive_key = election_id
            .filter(|_| exclusive)
            .map(|election_id| exclusive_key(voter_id, election_id, position_id));
        Self {
            voter_id,
            position_id,
            candidate_id,
            election_id,
            timestamp,
            exclusive_key,
        }
    }
}

/// The uniqueness key for a voter's single vote on a position within an election.
pub fn exclusive_key(voter_id: Id, election_id: Id, position_id: Id) -> String {
    format!("{voter_id}:{election_id}:{position_id}")
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::to_document;

    use super::*;

    #[test]
    fn exclusive_key_only_for_single_vote_elections() {
        let (voter, position, candidate, election) = (Id::new(), Id::new(), Id::new(), Id::new());
        let now = Utc::now();

        let single = NewVote::new(voter, position, candidate, Some(election), true, now);
        assert_eq!(
            single.exclusive_key,
            Some(format!("{voter}:{election}:{position}"))
        );

        let multiple = NewVote::new(voter, position, candidate, Some(election), false, now);
        assert_eq!(multiple.exclusive_key, None);

        let unscoped = NewVote::new(voter, position, candidate, None, true, now);
        assert_eq!(unscoped.exclusive_key, None);
    }

    #[test]
    fn absent_exclusive_key_is_not_stored() {
        let vote = NewVote::new(Id::new(), Id::new(), Id::new(), None, false, Utc::now());
        let doc = to_document(&vote).unwrap();
        assert!(!doc.contains_key("exclusive_key"));
        assert!(doc.contains_key("election_id"));
    }
}
