//! Pure vote counting: grouped counts in, ordered per-position results out.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Deserialize;

use crate::model::{
    api::election::{CandidateTally, NamedRef, PositionTally},
    db::{candidate::Candidate, position::Position},
    mongodb::Id,
};

const UNKNOWN_POSITION: &str = "Unknown Position";
const UNKNOWN_CANDIDATE: &str = "Unknown Candidate";

/// Number of votes for one candidate under one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VoteCount {
    pub position_id: Id,
    pub candidate_id: Id,
    pub count: u64,
}

/// `part` as a percentage of `total`, rounded to two decimals. Zero when `total` is zero.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of eligible voters who voted.
pub fn turnout(voted: u64, eligible: u64) -> f64 {
    percentage(voted, eligible)
}

/// Build per-position results.
///
/// Every position in `positions` is reported, as is every position with votes.
/// Each position lists all of its `candidates`, including those without votes;
/// voted-for candidates missing from `candidates` are reported by ID only.
/// Candidates are ordered by descending votes, then name, then ID. Positions
/// are ordered by name, then ID.
pub fn tally(
    positions: &[Position],
    candidates: &[Candidate],
    counts: &[VoteCount],
) -> Vec<PositionTally> {
    let candidate_names: HashMap<Id, &str> = candidates
        .iter()
        .map(|candidate| (candidate.id, candidate.name.as_str()))
        .collect();

    // Position ID -> (name, candidate ID -> votes).
    let mut table: HashMap<Id, (String, HashMap<Id, u64>)> = positions
        .iter()
        .map(|position| (position.id, (position.name.clone(), HashMap::new())))
        .collect();

    for candidate in candidates {
        if let Some((_, row)) = table.get_mut(&candidate.position_id) {
            row.entry(candidate.id).or_insert(0);
        }
    }

    for count in counts {
        let (_, row) = table
            .entry(count.position_id)
            .or_insert_with(|| (UNKNOWN_POSITION.to_string(), HashMap::new()));
        *row.entry(count.candidate_id).or_insert(0) += count.count;
    }

    let mut tallies: Vec<_> = table
        .into_iter()
        .map(|(position_id, (name, row))| {
            let total: u64 = row.values().sum();
            let mut candidates: Vec<_> = row
                .into_iter()
                .map(|(candidate_id, votes)| CandidateTally {
                    candidate: NamedRef {
                        id: candidate_id.into(),
                        name: candidate_names
                            .get(&candidate_id)
                            .copied()
                            .unwrap_or(UNKNOWN_CANDIDATE)
                            .to_string(),
                    },
                    vote_count: votes,
                    percentage: percentage(votes, total),
                })
                .collect();
            candidates.sort_by(rank_candidates);
            PositionTally {
                position: NamedRef {
                    id: position_id.into(),
                    name,
                },
                candidates,
                total_votes_for_position: total,
            }
        })
        .collect();

    tallies.sort_by(|a, b| {
        a.position
            .name
            .cmp(&b.position.name)
            .then_with(|| a.position.id.cmp(&b.position.id))
    });
    tallies
}

fn rank_candidates(a: &CandidateTally, b: &CandidateTally) -> Ordering {
    b.vote_count
        .cmp(&a.vote_count)
        .then_with(|| a.candidate.name.cmp(&b.candidate.name))
        .then_with(|| a.candidate.id.cmp(&b.candidate.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        api::id::ApiId,
        db::{candidate::CandidateCore, position::PositionCore},
    };

    fn position(core: PositionCore) -> Position {
        Position {
            id: Id::new(),
            position: core,
        }
    }

    fn candidate(name: &str, position_id: Id) -> Candidate {
        let mut core = CandidateCore::example(position_id);
        core.name = name.to_string();
        Candidate {
            id: Id::new(),
            candidate: core,
        }
    }

    fn count(position: &Position, candidate_id: Id, count: u64) -> VoteCount {
        VoteCount {
            position_id: position.id,
            candidate_id,
            count,
        }
    }

    #[test]
    fn rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(turnout(1, 8), 12.5);
    }

    #[test]
    fn zero_vote_candidates_are_listed() {
        let president = position(PositionCore::example());
        let c1 = candidate("Ada", president.id);
        let c2 = candidate("Ben", president.id);

        let tallies = tally(
            &[president.clone()],
            &[c1.clone(), c2.clone()],
            &[count(&president, c1.id, 1)],
        );

        assert_eq!(tallies.len(), 1);
        let result = &tallies[0];
        assert_eq!(result.total_votes_for_position, 1);
        assert_eq!(result.candidates[0].candidate.id, ApiId::from(c1.id));
        assert_eq!(result.candidates[0].percentage, 100.0);
        assert_eq!(result.candidates[1].candidate.id, ApiId::from(c2.id));
        assert_eq!(result.candidates[1].vote_count, 0);
        assert_eq!(result.candidates[1].percentage, 0.0);
    }

    #[test]
    fn percentages_are_per_position_and_sum_to_100() {
        let president = position(PositionCore::example());
        let treasurer = position(PositionCore::example2());
        let candidates = [
            candidate("Ada", president.id),
            candidate("Ben", president.id),
            candidate("Cy", president.id),
            candidate("Dee", treasurer.id),
        ];
        let counts = [
            count(&president, candidates[0].id, 1),
            count(&president, candidates[1].id, 1),
            count(&president, candidates[2].id, 1),
            count(&treasurer, candidates[3].id, 7),
        ];

        let tallies = tally(&[president, treasurer], &candidates, &counts);
        for result in &tallies {
            let sum: f64 = result.candidates.iter().map(|c| c.percentage).sum();
            assert!((sum - 100.0).abs() < 0.02, "{sum}");
        }
        // Treasurer's votes do not dilute the president's percentages.
        assert_eq!(tallies[0].position.name, "President");
        assert_eq!(tallies[0].candidates[0].percentage, 33.33);
        assert_eq!(tallies[1].candidates[0].percentage, 100.0);
    }

    #[test]
    fn ties_break_by_name() {
        let president = position(PositionCore::example());
        let zed = candidate("Zed", president.id);
        let amy = candidate("Amy", president.id);
        let counts = [count(&president, zed.id, 2), count(&president, amy.id, 2)];

        let tallies = tally(&[president], &[zed, amy], &counts);
        let names: Vec<_> = tallies[0]
            .candidates
            .iter()
            .map(|c| c.candidate.name.as_str())
            .collect();
        assert_eq!(names, ["Amy", "Zed"]);
    }

    #[test]
    fn missing_entities_are_unknown() {
        let ghost_position = position(PositionCore::example());
        let ghost_candidate = Id::new();

        let tallies = tally(&[], &[], &[count(&ghost_position, ghost_candidate, 3)]);
        assert_eq!(tallies[0].position.name, UNKNOWN_POSITION);
        assert_eq!(tallies[0].candidates[0].candidate.name, UNKNOWN_CANDIDATE);
        assert_eq!(tallies[0].candidates[0].vote_count, 3);
    }

    #[test]
    fn position_without_votes() {
        let president = position(PositionCore::example());
        let tallies = tally(&[president.clone()], &[candidate("Ada", president.id)], &[]);
        assert_eq!(tallies[0].total_votes_for_position, 0);
        assert_eq!(tallies[0].candidates[0].percentage, 0.0);
    }
}
