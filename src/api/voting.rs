use std::collections::HashMap;

use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions, Database};
use rocket::{
    futures::TryStreamExt,
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            election::TallyReport,
            envelope::{Count, Envelope, Reply},
            vote::{
                BallotLine, MyVote, MyVotes, VoteQuery, Voted, VotedCandidate, VotedElection,
                VotedPosition,
            },
        },
        db::{
            admin::Admin, candidate::Candidate, election::Election, position::Position,
            vote::Vote, voter::Voter,
        },
        mongodb::{Coll, Id},
    },
    voting::{self, report, MongoVoteStore, VoteError},
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![cast, cast_many, my_votes, tally]
}

/// Report a malformed ballot as a refused vote, after authentication has been checked.
fn ballot<T>(body: std::result::Result<Json<T>, JsonError<'_>>, reason: &str) -> Result<T> {
    body.map(|Json(body)| body)
        .map_err(|_| VoteError::InvalidRequest(reason.to_string()).into())
}

#[post("/voting", data = "<line>")]
async fn cast(
    token: Option<AuthToken<Voter>>,
    line: std::result::Result<Json<BallotLine>, JsonError<'_>>,
    store: MongoVoteStore,
    config: &State<Config>,
) -> Result<Reply<Voted>> {
    let voter = token.map(|token| token.id).ok_or(VoteError::Unauthenticated)?;
    let line = ballot(line, "Position and candidate are required")?;

    let recorded =
        voting::cast_vote(&store, Some(voter), line, config.voting_rules(), Utc::now()).await?;

    Ok(Envelope::success(Voted {
        vote: recorded.into(),
    })
    .message("Vote saved successfully")
    .created())
}

#[post("/voting/batch", data = "<lines>")]
async fn cast_many(
    token: Option<AuthToken<Voter>>,
    lines: std::result::Result<Json<Vec<BallotLine>>, JsonError<'_>>,
    store: MongoVoteStore,
    config: &State<Config>,
) -> Result<Reply<Count>> {
    let voter = token.map(|token| token.id).ok_or(VoteError::Unauthenticated)?;
    let lines = ballot(lines, "No votes provided or invalid format")?;

    let count =
        voting::cast_batch(&store, Some(voter), lines, config.voting_rules(), Utc::now()).await?;

    Ok(Envelope::success(Count { count })
        .message(format!("{count} votes saved successfully"))
        .created())
}

#[get("/voting/my-votes?<query..>")]
async fn my_votes(
    token: Option<AuthToken<Voter>>,
    query: VoteQuery,
    db: &State<Database>,
) -> Result<Reply<MyVotes>> {
    let voter = token.map(|token| token.id).ok_or(VoteError::Unauthenticated)?;

    let mut filter = doc! { "voter_id": voter };
    if let Some(election_id) = query.election_id {
        filter.insert("election_id", election_id);
    }
    let newest_first = FindOptions::builder().sort(doc! { "timestamp": -1 }).build();
    let votes: Vec<Vote> = Coll::<Vote>::from_db(db)
        .find(filter, newest_first)
        .await?
        .try_collect()
        .await?;

    let votes = describe_votes(db, votes).await?;
    let body = if query.election_id.is_some() || votes.is_empty() {
        MyVotes::list(votes)
    } else {
        MyVotes::grouped(votes)
    };
    Ok(Envelope::success(body).ok())
}

/// Attach the position, candidate and election each vote was cast for.
async fn describe_votes(db: &Database, votes: Vec<Vote>) -> Result<Vec<MyVote>> {
    let ids = |key: fn(&Vote) -> Option<Id>| {
        let mut ids: Vec<Id> = votes.iter().filter_map(key).collect();
        ids.sort();
        ids.dedup();
        ids
    };
    let position_ids = ids(|vote| Some(vote.position_id));
    let candidate_ids = ids(|vote| Some(vote.candidate_id));
    let election_ids = ids(|vote| vote.election_id);

    let positions: HashMap<Id, Position> = Coll::<Position>::from_db(db)
        .find(doc! { "_id": { "$in": position_ids } }, None)
        .await?
        .map_ok(|position| (position.id, position))
        .try_collect()
        .await?;
    let candidates: HashMap<Id, Candidate> = Coll::<Candidate>::from_db(db)
        .find(doc! { "_id": { "$in": candidate_ids } }, None)
        .await?
        .map_ok(|candidate| (candidate.id, candidate))
        .try_collect()
        .await?;
    let elections: HashMap<Id, Election> = Coll::<Election>::from_db(db)
        .find(doc! { "_id": { "$in": election_ids } }, None)
        .await?
        .map_ok(|election| (election.id, election))
        .try_collect()
        .await?;

    let now = Utc::now();
    Ok(votes
        .into_iter()
        .map(|vote| MyVote {
            id: vote.id.into(),
            position: positions.get(&vote.position_id).map(|position| VotedPosition {
                id: position.id.into(),
                name: position.name.clone(),
                description: position.description.clone(),
            }),
            candidate: candidates
                .get(&vote.candidate_id)
                .map(|candidate| VotedCandidate {
                    id: candidate.id.into(),
                    name: candidate.name.clone(),
                    profile: candidate.profile.clone(),
                }),
            election: vote
                .election_id
                .and_then(|election_id| elections.get(&election_id))
                .map(|election| VotedElection {
                    id: election.id.to_string(),
                    title: election.title.clone(),
                    status: Some(election.status_at(now)),
                }),
            voted_at: vote.timestamp,
        })
        .collect())
}

#[get("/voting?<query..>")]
async fn tally(
    token: Option<AuthToken<Admin>>,
    query: VoteQuery,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Reply<TallyReport>> {
    AuthToken::require(token)?;

    let election = match query.election_id {
        Some(election_id) => Some(
            elections
                .find_one(election_id.as_doc(), None)
                .await?
                .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?,
        ),
        None => None,
    };

    let report = report::tally_report(db, election.as_ref(), Utc::now()).await?;
    Ok(Envelope::success(report).ok())
}
