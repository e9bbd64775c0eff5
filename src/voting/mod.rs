//! Vote submission and eligibility validation.
//!
//! Every check reads through a [`VoteStore`], so the rules here are independent
//! of the database. Checks run in a fixed order and stop at the first failure.

mod error;
#[cfg(test)]
mod memory;
pub mod report;
mod store;
pub mod tally;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{error, info};

use crate::model::{
    api::vote::{BallotLine, CandidateRef, ElectionRef, PositionRef, VoteReceipt},
    db::{
        candidate::Candidate,
        election::Election,
        position::Position,
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

pub use error::VoteError;
pub use store::{MongoVoteStore, VoteStore};

/// Deployment-wide voting rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VotingRules {
    /// Accept votes that name no election, skipping every election check.
    pub allow_unscoped: bool,
}

/// A stored vote together with what it was cast for.
#[derive(Debug)]
pub struct RecordedVote {
    pub vote: Vote,
    pub position: Option<Position>,
    pub candidate: Option<Candidate>,
    pub election: Option<Election>,
}

impl From<RecordedVote> for VoteReceipt {
    fn from(recorded: RecordedVote) -> Self {
        Self {
            id: recorded.vote.id.into(),
            position: recorded.position.map(|position| PositionRef {
                id: position.id.into(),
                name: position.position.name,
            }),
            candidate: recorded.candidate.map(|candidate| CandidateRef {
                id: candidate.id.into(),
                name: candidate.candidate.name,
            }),
            election: recorded.election.map(|election| ElectionRef {
                id: election.id.into(),
                title: election.election.title,
            }),
        }
    }
}

/// Validate and record a single vote by `voter`.
pub async fn cast_vote<S>(
    store: &S,
    voter: Option<Id>,
    line: BallotLine,
    rules: VotingRules,
    now: DateTime<Utc>,
) -> Result<RecordedVote, VoteError>
where
    S: VoteStore + ?Sized,
{
    let result = record_vote(store, voter, line, rules, now).await;
    match &result {
        Ok(recorded) => info!(
            "Voter {} voted for candidate {} (vote {})",
            recorded.vote.voter_id, recorded.vote.candidate_id, recorded.vote.id
        ),
        Err(err) => log_rejection(voter, err),
    }
    result
}

/// Validate and record a batch of votes by `voter`, all or nothing.
/// Returns the number of votes recorded.
pub async fn cast_batch<S>(
    store: &S,
    voter: Option<Id>,
    lines: Vec<BallotLine>,
    rules: VotingRules,
    now: DateTime<Utc>,
) -> Result<u64, VoteError>
where
    S: VoteStore + ?Sized,
{
    let result = record_batch(store, voter, lines, rules, now).await;
    match &result {
        Ok(count) => info!("Voter {} cast a batch of {count} votes", display(voter)),
        Err(err) => log_rejection(voter, err),
    }
    result
}

async fn record_vote<S>(
    store: &S,
    voter: Option<Id>,
    line: BallotLine,
    rules: VotingRules,
    now: DateTime<Utc>,
) -> Result<RecordedVote, VoteError>
where
    S: VoteStore + ?Sized,
{
    let voter_id = voter.ok_or(VoteError::Unauthenticated)?;

    let (election, exclusive) = match line.election_id {
        Some(election_id) => {
            let election = open_election(store, election_id, now).await?;

            let linked = store
                .linked_positions(election_id, &[line.position_id])
                .await?;
            if !linked.contains(&line.position_id) {
                return Err(VoteError::PositionNotInElection);
            }

            check_candidates(store, &[&line]).await?;

            let exclusive = !allows_multiple_votes(store, election_id).await?;
            if exclusive
                && store
                    .voted_positions(voter_id, election_id)
                    .await?
                    .contains(&line.position_id)
            {
                return Err(VoteError::DuplicateVote);
            }
            (Some(election), exclusive)
        }
        None => {
            require_unscoped_allowed(rules)?;
            (None, false)
        }
    };

    let vote = store
        .insert_vote(NewVote::new(
            voter_id,
            line.position_id,
            line.candidate_id,
            line.election_id,
            exclusive,
            now,
        ))
        .await?;

    let position = store.position(line.position_id).await?;
    let candidate = store
        .candidates(&[line.candidate_id])
        .await?
        .into_iter()
        .next();
    Ok(RecordedVote {
        vote,
        position,
        candidate,
        election,
    })
}

async fn record_batch<S>(
    store: &S,
    voter: Option<Id>,
    lines: Vec<BallotLine>,
    rules: VotingRules,
    now: DateTime<Utc>,
) -> Result<u64, VoteError>
where
    S: VoteStore + ?Sized,
{
    let voter_id = voter.ok_or(VoteError::Unauthenticated)?;

    if lines.is_empty() {
        return Err(VoteError::InvalidRequest(
            "No votes provided or invalid format".to_string(),
        ));
    }

    let election_ids: HashSet<Id> = lines.iter().filter_map(|line| line.election_id).collect();
    if election_ids.len() > 1 {
        return Err(VoteError::MixedElections);
    }
    let election_id = election_ids.into_iter().next();

    let exclusive = match election_id {
        Some(election_id) => {
            open_election(store, election_id, now).await?;
            let position_ids: Vec<Id> = lines.iter().map(|line| line.position_id).collect();

            let exclusive = !allows_multiple_votes(store, election_id).await?;
            if exclusive {
                let voted = store.voted_positions(voter_id, election_id).await?;

                let mut seen = HashSet::new();
                if !position_ids.iter().all(|id| seen.insert(*id)) {
                    return Err(VoteError::DuplicatePositionsInRequest);
                }
                if position_ids.iter().any(|id| voted.contains(id)) {
                    return Err(VoteError::AlreadyVoted);
                }
            }

            let linked = store.linked_positions(election_id, &position_ids).await?;
            if !position_ids.iter().all(|id| linked.contains(id)) {
                return Err(VoteError::PositionNotInElection);
            }

            check_candidates(store, &lines.iter().collect::<Vec<_>>()).await?;
            exclusive
        }
        None => {
            require_unscoped_allowed(rules)?;
            false
        }
    };

    // The batch's election applies to every line, including lines that omitted it.
    let votes = lines
        .into_iter()
        .map(|line| {
            NewVote::new(
                voter_id,
                line.position_id,
                line.candidate_id,
                election_id,
                exclusive,
                now,
            )
        })
        .collect();
    store.insert_votes(votes).await
}

/// Fetch an election and check it is accepting votes at `now`.
async fn open_election<S>(
    store: &S,
    election_id: Id,
    now: DateTime<Utc>,
) -> Result<Election, VoteError>
where
    S: VoteStore + ?Sized,
{
    let election = store
        .election(election_id)
        .await?
        .ok_or(VoteError::NotFound("Election"))?;
    if !election.is_active {
        return Err(VoteError::ElectionInactive);
    }
    if now < election.start_date || now > election.end_date {
        return Err(VoteError::VotingWindowClosed);
    }
    Ok(election)
}

/// Missing settings mean one vote per position.
async fn allows_multiple_votes<S>(store: &S, election_id: Id) -> Result<bool, VoteError>
where
    S: VoteStore + ?Sized,
{
    Ok(store
        .settings(election_id)
        .await?
        .map_or(false, |settings| settings.allow_multiple_votes))
}

/// Check every line's candidate exists and stands for that line's position.
async fn check_candidates<S>(store: &S, lines: &[&BallotLine]) -> Result<(), VoteError>
where
    S: VoteStore + ?Sized,
{
    let candidate_ids: Vec<Id> = lines.iter().map(|line| line.candidate_id).collect();
    let candidates = store.candidates(&candidate_ids).await?;
    let valid = lines.iter().all(|line| {
        candidates.iter().any(|candidate| {
            candidate.id == line.candidate_id && candidate.position_id == line.position_id
        })
    });
    if valid {
        Ok(())
    } else {
        Err(VoteError::CandidateNotInPosition)
    }
}

fn require_unscoped_allowed(rules: VotingRules) -> Result<(), VoteError> {
    if rules.allow_unscoped {
        Ok(())
    } else {
        Err(VoteError::InvalidRequest("An electionId is required".to_string()))
    }
}

fn log_rejection(voter: Option<Id>, err: &VoteError) {
    match err {
        VoteError::Persistence(e) => error!("Failed to record vote for {}: {e}", display(voter)),
        _ => info!("Rejected vote from {}: {err}", display(voter)),
    }
}

fn display(voter: Option<Id>) -> String {
    voter.map_or_else(|| "anonymous".to_string(), |id| id.to_string())
}
