//! Vote aggregation over MongoDB, feeding [`super::tally`].

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, from_document, Document},
    error::Error as DbError,
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;
use serde::Deserialize;

use super::tally::{self, VoteCount};
use crate::model::{
    api::election::{ElectionResults, ElectionView, TallyReport},
    db::{
        candidate::Candidate,
        election::{Election, ElectionPosition},
        position::Position,
        vote::Vote,
        voter::Voter,
    },
    mongodb::{Coll, Id},
};

#[derive(Deserialize)]
struct GroupKey {
    position_id: Id,
    candidate_id: Id,
}

#[derive(Deserialize)]
struct GroupRow {
    #[serde(rename = "_id")]
    key: GroupKey,
    count: u64,
}

fn scope(election_id: Option<Id>) -> Document {
    match election_id {
        Some(election_id) => doc! { "election_id": election_id },
        None => doc! {},
    }
}

/// Votes grouped by (position, candidate), optionally within one election.
pub async fn vote_counts(
    db: &Database,
    election_id: Option<Id>,
) -> Result<Vec<VoteCount>, DbError> {
    let pipeline = [
        doc! { "$match": scope(election_id) },
        doc! {
            "$group": {
                "_id": { "position_id": "$position_id", "candidate_id": "$candidate_id" },
                "count": { "$sum": 1 },
            }
        },
    ];
    let rows: Vec<Document> = Coll::<Vote>::from_db(db)
        .aggregate(pipeline, None)
        .await?
        .try_collect()
        .await?;
    rows.into_iter()
        .map(|row| {
            let row: GroupRow = from_document(row)?;
            Ok(VoteCount {
                position_id: row.key.position_id,
                candidate_id: row.key.candidate_id,
                count: row.count,
            })
        })
        .collect()
}

/// Number of distinct voters with at least one vote in scope.
pub async fn distinct_voters(db: &Database, election_id: Option<Id>) -> Result<u64, DbError> {
    let voters = Coll::<Vote>::from_db(db)
        .distinct("voter_id", scope(election_id), None)
        .await?;
    Ok(voters.len() as u64)
}

/// Number of registered voters who have not been removed.
pub async fn eligible_voters(db: &Database) -> Result<u64, DbError> {
    Coll::<Voter>::from_db(db)
        .count_documents(doc! { "deleted": { "$ne": true } }, None)
        .await
}

/// Positions linked to an election, ordered by name.
pub async fn election_positions(db: &Database, election_id: Id) -> Result<Vec<Position>, DbError> {
    let links: Vec<ElectionPosition> = Coll::<ElectionPosition>::from_db(db)
        .find(doc! { "election_id": election_id }, None)
        .await?
        .try_collect()
        .await?;
    let position_ids: Vec<Id> = links.into_iter().map(|link| link.position_id).collect();
    positions_by_id(db, &position_ids).await
}

async fn positions_by_id(db: &Database, position_ids: &[Id]) -> Result<Vec<Position>, DbError> {
    let by_name = FindOptions::builder().sort(doc! { "name": 1 }).build();
    Coll::<Position>::from_db(db)
        .find(
            doc! { "_id": { "$in": position_ids.iter().copied().collect::<Vec<_>>() } },
            by_name,
        )
        .await?
        .try_collect()
        .await
}

/// Candidates still standing for any of the given positions.
pub async fn standing_candidates(
    db: &Database,
    position_ids: &[Id],
) -> Result<Vec<Candidate>, DbError> {
    Coll::<Candidate>::from_db(db)
        .find(
            doc! {
                "position_id": { "$in": position_ids.iter().copied().collect::<Vec<_>>() },
                "deleted": { "$ne": true },
            },
            None,
        )
        .await?
        .try_collect()
        .await
}

/// Vote tally, optionally scoped to an election.
///
/// With an election, every linked position is reported; otherwise only
/// positions that received votes.
pub async fn tally_report(
    db: &Database,
    election: Option<&Election>,
    now: DateTime<Utc>,
) -> Result<TallyReport, DbError> {
    let election_id = election.map(|election| election.id);
    let counts = vote_counts(db, election_id).await?;

    let positions = match election_id {
        Some(election_id) => election_positions(db, election_id).await?,
        None => {
            let mut voted: Vec<Id> = counts.iter().map(|count| count.position_id).collect();
            voted.sort();
            voted.dedup();
            positions_by_id(db, &voted).await?
        }
    };
    let position_ids: Vec<Id> = positions.iter().map(|position| position.id).collect();
    let candidates = standing_candidates(db, &position_ids).await?;

    Ok(TallyReport {
        election: election.map(|election| ElectionView::new(election, now)),
        total_votes: counts.iter().map(|count| count.count).sum(),
        positions: tally::tally(&positions, &candidates, &counts),
    })
}

/// Full results of one election, including turnout.
pub async fn election_results(
    db: &Database,
    election: &Election,
    now: DateTime<Utc>,
) -> Result<ElectionResults, DbError> {
    let report = tally_report(db, Some(election), now).await?;
    let eligible_voters = eligible_voters(db).await?;
    let unique_voters = distinct_voters(db, Some(election.id)).await?;

    Ok(ElectionResults {
        election: ElectionView::new(election, now),
        total_votes: report.total_votes,
        eligible_voters,
        unique_voters,
        turnout: tally::turnout(unique_voters, eligible_voters),
        positions: report.positions,
    })
}
