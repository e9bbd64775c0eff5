//! In-memory [`VoteStore`] with the same uniqueness and atomicity guarantees
//! as the MongoDB store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use mongodb::error::Error as DbError;

use super::{tally::VoteCount, VoteError, VoteStore};
use crate::model::{
    db::{
        candidate::{Candidate, CandidateCore},
        election::{Election, ElectionCore, ElectionSettings, ElectionSettingsCore},
        position::{Position, PositionCore},
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};

#[derive(Default)]
struct State {
    elections: HashMap<Id, Election>,
    settings: HashMap<Id, ElectionSettings>,
    links: HashSet<(Id, Id)>,
    positions: Vec<Position>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
    /// Report no prior votes, as a concurrent request would see before the other commits.
    stale_reads: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn add_election(&self, election: ElectionCore) -> Id {
        let id = Id::new();
        self.state.lock().unwrap().elections.insert(
            id,
            Election {
                id,
                election,
            },
        );
        id
    }

    pub fn set_active(&self, election_id: Id, is_active: bool) {
        if let Some(election) = self.state.lock().unwrap().elections.get_mut(&election_id) {
            election.is_active = is_active;
        }
    }

    pub fn election_start(&self, election_id: Id) -> DateTime<Utc> {
        self.state.lock().unwrap().elections[&election_id].start_date
    }

    pub fn set_settings(&self, settings: ElectionSettingsCore) {
        self.state.lock().unwrap().settings.insert(
            settings.election_id,
            ElectionSettings {
                id: Id::new(),
                settings,
            },
        );
    }

    pub fn add_position(&self, name: &str) -> Id {
        let id = Id::new();
        let mut position = PositionCore::example();
        position.name = name.to_string();
        self.state
            .lock()
            .unwrap()
            .positions
            .push(Position { id, position });
        id
    }

    pub fn link(&self, election_id: Id, position_id: Id) {
        self.state
            .lock()
            .unwrap()
            .links
            .insert((election_id, position_id));
    }

    pub fn add_candidate(&self, name: &str, position_id: Id) -> Id {
        let id = Id::new();
        let mut candidate = CandidateCore::example(position_id);
        candidate.name = name.to_string();
        self.state
            .lock()
            .unwrap()
            .candidates
            .push(Candidate { id, candidate });
        id
    }

    pub fn set_stale_reads(&self, stale_reads: bool) {
        self.state.lock().unwrap().stale_reads = stale_reads;
    }

    pub fn vote_count(&self) -> usize {
        self.state.lock().unwrap().votes.len()
    }

    pub fn votes(&self) -> Vec<Vote> {
        self.state.lock().unwrap().votes.clone()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.state.lock().unwrap().positions.clone()
    }

    pub fn candidate_list(&self) -> Vec<Candidate> {
        self.state.lock().unwrap().candidates.clone()
    }

    /// Votes grouped by (position, candidate).
    pub fn counts(&self) -> Vec<VoteCount> {
        let mut counts: HashMap<(Id, Id), u64> = HashMap::new();
        for vote in &self.state.lock().unwrap().votes {
            *counts
                .entry((vote.position_id, vote.candidate_id))
                .or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|((position_id, candidate_id), count)| VoteCount {
                position_id,
                candidate_id,
                count,
            })
            .collect()
    }
}

impl State {
    fn claimed_keys(&self) -> HashSet<&str> {
        self.votes
            .iter()
            .filter_map(|vote| vote.exclusive_key.as_deref())
            .collect()
    }
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn election(&self, election_id: Id) -> Result<Option<Election>, DbError> {
        Ok(self.state.lock().unwrap().elections.get(&election_id).cloned())
    }

    async fn settings(&self, election_id: Id) -> Result<Option<ElectionSettings>, DbError> {
        Ok(self.state.lock().unwrap().settings.get(&election_id).cloned())
    }

    async fn linked_positions(
        &self,
        election_id: Id,
        position_ids: &[Id],
    ) -> Result<HashSet<Id>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(position_ids
            .iter()
            .copied()
            .filter(|position_id| state.links.contains(&(election_id, *position_id)))
            .collect())
    }

    async fn voted_positions(&self, voter_id: Id, election_id: Id) -> Result<HashSet<Id>, DbError> {
        let state = self.state.lock().unwrap();
        if state.stale_reads {
            return Ok(HashSet::new());
        }
        Ok(state
            .votes
            .iter()
            .filter(|vote| vote.voter_id == voter_id && vote.election_id == Some(election_id))
            .map(|vote| vote.position_id)
            .collect())
    }

    async fn position(&self, position_id: Id) -> Result<Option<Position>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .positions
            .iter()
            .find(|position| position.id == position_id)
            .cloned())
    }

    async fn candidates(&self, candidate_ids: &[Id]) -> Result<Vec<Candidate>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .candidates
            .iter()
            .filter(|candidate| !candidate.deleted && candidate_ids.contains(&candidate.id))
            .cloned()
            .collect())
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote, VoteError> {
        let mut state = self.state.lock().unwrap();
        if let Some(key) = &vote.exclusive_key {
            if state.claimed_keys().contains(key.as_str()) {
                return Err(VoteError::DuplicateVote);
            }
        }
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        state.votes.push(vote.clone());
        Ok(vote)
    }

    async fn insert_votes(&self, votes: Vec<NewVote>) -> Result<u64, VoteError> {
        let mut state = self.state.lock().unwrap();
        let mut claimed: HashSet<String> = state
            .claimed_keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        for vote in &votes {
            if let Some(key) = &vote.exclusive_key {
                if !claimed.insert(key.clone()) {
                    return Err(VoteError::AlreadyVoted);
                }
            }
        }
        let count = votes.len() as u64;
        state.votes.extend(votes.into_iter().map(|vote| Vote {
            id: Id::new(),
            vote,
        }));
        Ok(count)
    }
}
