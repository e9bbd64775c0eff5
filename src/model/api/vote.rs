use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::ElectionStatus,
    mongodb::Id,
};

/// One choice on a ballot: a candidate for a position, optionally within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotLine {
    pub position_id: Id,
    pub candidate_id: Id,
    #[serde(default)]
    pub election_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionRef {
    pub id: ApiId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateRef {
    pub id: ApiId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionRef {
    pub id: ApiId,
    pub title: String,
}

/// Confirmation of a recorded vote, with the names of what was voted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteReceipt {
    pub id: ApiId,
    pub position: Option<PositionRef>,
    pub candidate: Option<CandidateRef>,
    pub election: Option<ElectionRef>,
}

/// Payload placing a receipt under `vote`.
#[derive(Debug, Serialize)]
pub struct Voted {
    pub vote: VoteReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotedPosition {
    pub id: ApiId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotedCandidate {
    pub id: ApiId,
    pub name: String,
    pub profile: String,
}

/// The election a vote belongs to. Unscoped votes are grouped under the id `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotedElection {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ElectionStatus>,
}

impl VotedElection {
    pub fn unknown() -> Self {
        Self {
            id: "unknown".to_string(),
            title: "Unknown Election".to_string(),
            status: None,
        }
    }
}

/// One of the caller's own votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVote {
    pub id: ApiId,
    pub position: Option<VotedPosition>,
    pub candidate: Option<VotedCandidate>,
    pub election: Option<VotedElection>,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionVotes {
    pub election: VotedElection,
    pub votes: Vec<MyVote>,
}

/// The caller's votes, either as a flat list or grouped by election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MyVotes {
    List {
        count: usize,
        votes: Vec<MyVote>,
    },
    #[serde(rename_all = "camelCase")]
    Grouped {
        total_votes: usize,
        elections: Vec<ElectionVotes>,
    },
}

impl MyVotes {
    /// A flat list of votes.
    pub fn list(votes: Vec<MyVote>) -> Self {
        Self::List {
            count: votes.len(),
            votes,
        }
    }

    /// Group votes by election, keeping the order in which each election first appears.
    pub fn grouped(votes: Vec<MyVote>) -> Self {
        let total_votes = votes.len();
        let mut elections: Vec<ElectionVotes> = Vec::new();
        for vote in votes {
            let election = vote.election.clone().unwrap_or_else(VotedElection::unknown);
            match elections.iter_mut().find(|group| group.election.id == election.id) {
                Some(group) => group.votes.push(vote),
                None => elections.push(ElectionVotes {
                    election,
                    votes: vec![vote],
                }),
            }
        }
        Self::Grouped {
            total_votes,
            elections,
        }
    }
}

#[derive(Debug, Default, FromForm)]
pub struct VoteQuery {
    #[field(name = "electionId")]
    pub election_id: Option<Id>,
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json::{self, json};

    use super::*;

    fn my_vote(election: Option<VotedElection>) -> MyVote {
        MyVote {
            id: Id::new().into(),
            position: None,
            candidate: None,
            election,
            voted_at: Utc::now(),
        }
    }

    #[test]
    fn ballot_line_accepts_hex_ids() {
        let position = Id::new();
        let candidate = Id::new();
        let line: BallotLine = serde_json::from_value(json!({
            "positionId": position.to_string(),
            "candidateId": candidate.to_string(),
        }))
        .unwrap();
        assert_eq!(line.position_id, position);
        assert_eq!(line.candidate_id, candidate);
        assert_eq!(line.election_id, None);
    }

    #[test]
    fn votes_group_by_election() {
        let council = VotedElection {
            id: Id::new().to_string(),
            title: "Council".into(),
            status: Some(ElectionStatus::Ongoing),
        };
        let votes = vec![
            my_vote(Some(council.clone())),
            my_vote(None),
            my_vote(Some(council.clone())),
        ];

        match MyVotes::grouped(votes) {
            MyVotes::Grouped {
                total_votes,
                elections,
            } => {
                assert_eq!(total_votes, 3);
                assert_eq!(elections.len(), 2);
                assert_eq!(elections[0].election, council);
                assert_eq!(elections[0].votes.len(), 2);
                assert_eq!(elections[1].election.id, "unknown");
            }
            other => panic!("expected grouped votes, got {other:?}"),
        }
    }

    #[test]
    fn grouped_serialisation() {
        let value = serde_json::to_value(MyVotes::grouped(vec![my_vote(None)])).unwrap();
        assert_eq!(value["totalVotes"], 1);
        assert_eq!(value["elections"][0]["election"]["title"], "Unknown Election");
    }
}
