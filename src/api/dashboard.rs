use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::debug;
use mongodb::{
    bson::{doc, from_document, Document},
    options::FindOptions,
    Database,
};
use rocket::{futures::TryStreamExt, Route, State};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            dashboard::{
                DailyVotes, Dashboard, ElectionCounts, History, RecentVote, SnapshotDescription,
                TopPosition, Totals,
            },
            envelope::{Data, Envelope, Reply},
        },
        common::election::ElectionStatus,
        db::{
            admin::Admin,
            analytics::{AnalyticsSnapshot, NewAnalyticsSnapshot},
            candidate::Candidate,
            election::Election,
            position::Position,
            vote::Vote,
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
    voting::{report, tally},
};

const RECENT_VOTES: i64 = 10;
const TOP_POSITIONS: i64 = 5;
const DEFAULT_HISTORY_DAYS: u32 = 30;
const MAX_HISTORY_DAYS: u32 = 3660;

pub fn routes() -> Vec<Route> {
    routes![dashboard, history]
}

#[get("/dashboard")]
async fn dashboard(
    token: Option<AuthToken<Admin>>,
    db: &State<Database>,
) -> Result<Reply<Data<Dashboard>>> {
    AuthToken::require(token)?;
    let now = Utc::now();

    let totals = totals(db).await?;
    let elections = election_counts(db, now).await?;
    let recent_votes = recent_votes(db).await?;
    let top_positions = top_positions(db).await?;

    let snapshot = NewAnalyticsSnapshot {
        date: now,
        total_voters: totals.voters,
        total_candidates: totals.candidates,
        total_positions: totals.positions,
        active_elections: elections.active,
        completed_elections: elections.completed,
        total_votes_cast: totals.votes,
        voter_turnout: totals.turnout,
    };
    Coll::<NewAnalyticsSnapshot>::from_db(db)
        .insert_one(&snapshot, None)
        .await?;
    debug!("Recorded analytics snapshot at {now}");

    Ok(Envelope::data(Dashboard {
        totals,
        elections,
        recent_votes,
        top_positions,
    })
    .ok())
}

/// Start of a `days`-long window ending at `now`.
fn window_start(days: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(Error::bad_request(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| Error::bad_request("days is out of range"))
}

#[get("/dashboard/historical?<days>")]
async fn history(
    token: Option<AuthToken<Admin>>,
    days: Option<u32>,
    db: &State<Database>,
) -> Result<Reply<Data<History>>> {
    AuthToken::require(token)?;
    let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let since = window_start(days, Utc::now())?;

    let oldest_first = FindOptions::builder().sort(doc! { "date": 1 }).build();
    let snapshots = Coll::<AnalyticsSnapshot>::from_db(db)
        .find(doc! { "date": { "$gte": since } }, oldest_first)
        .await?
        .map_ok(SnapshotDescription::from)
        .try_collect()
        .await?;

    Ok(Envelope::data(History {
        days,
        snapshots,
        votes_per_day: votes_per_day(db, since).await?,
    })
    .ok())
}

async fn totals(db: &Database) -> Result<Totals> {
    let current = doc! { "deleted": { "$ne": true } };
    let voters = report::eligible_voters(db).await?;
    let candidates = Coll::<Candidate>::from_db(db)
        .count_documents(current.clone(), None)
        .await?;
    let positions = Coll::<Position>::from_db(db)
        .count_documents(current, None)
        .await?;
    let votes = Coll::<Vote>::from_db(db).count_documents(None, None).await?;

    // Only registered voters who have not been removed count as active.
    let voted = Coll::<Vote>::from_db(db)
        .distinct("voter_id", None, None)
        .await?;
    let active_voters = Coll::<Voter>::from_db(db)
        .count_documents(
            doc! { "_id": { "$in": voted }, "deleted": { "$ne": true } },
            None,
        )
        .await?;

    Ok(Totals {
        voters,
        active_voters,
        candidates,
        positions,
        votes,
        turnout: tally::turnout(active_voters, voters),
    })
}

async fn election_counts(db: &Database, now: DateTime<Utc>) -> Result<ElectionCounts> {
    let elections: Vec<Election> = Coll::<Election>::from_db(db)
        .find(None, None)
        .await?
        .try_collect()
        .await?;

    let mut counts = ElectionCounts {
        total: elections.len() as u64,
        active: 0,
        upcoming: 0,
        completed: 0,
    };
    for election in &elections {
        match election.status_at(now) {
            ElectionStatus::Upcoming => counts.upcoming += 1,
            ElectionStatus::Ongoing if election.is_active => counts.active += 1,
            ElectionStatus::Ongoing => {}
            ElectionStatus::Completed => counts.completed += 1,
        }
    }
    Ok(counts)
}

/// Look up documents by ID, keyed by ID.
async fn by_id<T>(coll: Coll<T>, ids: Vec<Id>) -> Result<HashMap<Id, T>>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync + Identified,
{
    Ok(coll
        .find(doc! { "_id": { "$in": ids } }, None)
        .await?
        .map_ok(|item| (item.id(), item))
        .try_collect()
        .await?)
}

trait Identified {
    fn id(&self) -> Id;
}

macro_rules! identified {
    ($($ty:ty),+) => {
        $(
            impl Identified for $ty {
                fn id(&self) -> Id {
                    self.id
                }
            }
        )+
    };
}

identified!(Voter, Position, Candidate, Election);

async fn recent_votes(db: &Database) -> Result<Vec<RecentVote>> {
    let newest_first = FindOptions::builder()
        .sort(doc! { "timestamp": -1 })
        .limit(RECENT_VOTES)
        .build();
    let votes: Vec<Vote> = Coll::<Vote>::from_db(db)
        .find(None, newest_first)
        .await?
        .try_collect()
        .await?;

    let voters = by_id(
        Coll::<Voter>::from_db(db),
        votes.iter().map(|vote| vote.voter_id).collect(),
    )
    .await?;
    let positions = by_id(
        Coll::<Position>::from_db(db),
        votes.iter().map(|vote| vote.position_id).collect(),
    )
    .await?;
    let candidates = by_id(
        Coll::<Candidate>::from_db(db),
        votes.iter().map(|vote| vote.candidate_id).collect(),
    )
    .await?;
    let elections = by_id(
        Coll::<Election>::from_db(db),
        votes.iter().filter_map(|vote| vote.election_id).collect(),
    )
    .await?;

    Ok(votes
        .into_iter()
        .map(|vote| RecentVote {
            id: vote.id.into(),
            voter: voters
                .get(&vote.voter_id)
                .map_or_else(|| "Unknown Voter".to_string(), |v| v.student_name.clone()),
            position: positions
                .get(&vote.position_id)
                .map_or_else(|| "Unknown Position".to_string(), |p| p.name.clone()),
            candidate: candidates
                .get(&vote.candidate_id)
                .map_or_else(|| "Unknown Candidate".to_string(), |c| c.name.clone()),
            election: vote
                .election_id
                .and_then(|election_id| elections.get(&election_id))
                .map(|election| election.title.clone()),
            timestamp: vote.timestamp,
        })
        .collect())
}

#[derive(Deserialize)]
struct PositionCount {
    #[serde(rename = "_id")]
    position_id: Id,
    count: u64,
}

async fn top_positions(db: &Database) -> Result<Vec<TopPosition>> {
    let pipeline = [
        doc! { "$group": { "_id": "$position_id", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
        doc! { "$limit": TOP_POSITIONS },
    ];
    let rows: Vec<Document> = Coll::<Vote>::from_db(db)
        .aggregate(pipeline, None)
        .await?
        .try_collect()
        .await?;
    let counts = rows
        .into_iter()
        .map(from_document::<PositionCount>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(mongodb::error::Error::from)?;

    let positions = by_id(
        Coll::<Position>::from_db(db),
        counts.iter().map(|count| count.position_id).collect(),
    )
    .await?;

    Ok(counts
        .into_iter()
        .map(|count| TopPosition {
            id: count.position_id.into(),
            name: positions
                .get(&count.position_id)
                .map_or_else(|| "Unknown Position".to_string(), |p| p.name.clone()),
            vote_count: count.count,
        })
        .collect())
}

#[derive(Deserialize)]
struct DayCount {
    #[serde(rename = "_id")]
    day: String,
    count: u64,
}

/// Votes cast per UTC calendar day since `since`, oldest first.
async fn votes_per_day(db: &Database, since: DateTime<Utc>) -> Result<Vec<DailyVotes>> {
    let pipeline = [
        doc! { "$match": { "timestamp": { "$gte": since } } },
        doc! {
            "$group": {
                "_id": { "$dateToString": { "format": "%Y-%m-%d", "date": "$timestamp" } },
                "count": { "$sum": 1 },
            }
        },
        doc! { "$sort": { "_id": 1 } },
    ];
    let rows: Vec<Document> = Coll::<Vote>::from_db(db)
        .aggregate(pipeline, None)
        .await?
        .try_collect()
        .await?;

    let mut days = Vec::with_capacity(rows.len());
    for row in rows {
        let row: DayCount = from_document(row).map_err(mongodb::error::Error::from)?;
        let date = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d").map_err(|err| {
            Error::Status(
                rocket::http::Status::InternalServerError,
                format!("Unexpected day {}: {err}", row.day),
            )
        })?;
        days.push(DailyVotes {
            date,
            count: row.count,
        });
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::Value,
    };

    use crate::api::fixtures::seed;
    use crate::model::db::{election::ElectionCore, vote::VoteCore};

    use super::*;

    #[backend_test(admin)]
    async fn dashboard_counts(
        client: Client,
        db: Database,
        votes: Coll<Vote>,
        snapshots: Coll<AnalyticsSnapshot>,
    ) {
        let ongoing = seed(&db, ElectionCore::ongoing_example()).await;
        seed(&db, ElectionCore::example()).await;
        seed(&db, ElectionCore::upcoming_example()).await;

        let voter = Id::new();
        votes
            .insert_one(
                Vote {
                    id: Id::new(),
                    vote: VoteCore::new(
                        voter,
                        ongoing.position,
                        ongoing.candidates[1],
                        Some(ongoing.election),
                        true,
                        Utc::now(),
                    ),
                },
                None,
            )
            .await
            .unwrap();

        let response = client.get(uri!(dashboard)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        let data = &body["data"];

        assert_eq!(data["elections"]["total"], 3);
        assert_eq!(data["elections"]["active"], 1);
        assert_eq!(data["elections"]["upcoming"], 1);
        assert_eq!(data["elections"]["completed"], 1);
        assert_eq!(data["totals"]["votes"], 1);
        assert_eq!(data["totals"]["candidates"], 6);
        // The voter is not registered, so does not count towards turnout.
        assert_eq!(data["totals"]["activeVoters"], 0);
        assert_eq!(data["recentVotes"][0]["candidate"], "Ben Carter");
        assert_eq!(data["recentVotes"][0]["voter"], "Unknown Voter");
        assert_eq!(data["recentVotes"][0]["election"], "Club Officers");
        assert_eq!(data["topPositions"][0]["name"], "President");
        assert_eq!(data["topPositions"][0]["voteCount"], 1);

        assert_eq!(snapshots.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test(admin)]
    async fn history_window(client: Client, votes: Coll<Vote>) {
        client.get(uri!(dashboard)).dispatch().await;
        votes
            .insert_one(
                Vote {
                    id: Id::new(),
                    vote: VoteCore::new(Id::new(), Id::new(), Id::new(), None, false, Utc::now()),
                },
                None,
            )
            .await
            .unwrap();

        let response = client.get("/dashboard/historical?days=7").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["days"], 7);
        assert_eq!(body["data"]["snapshots"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["votesPerDay"][0]["count"], 1);
        assert_eq!(
            body["data"]["votesPerDay"][0]["date"],
            Utc::now().date_naive().to_string()
        );

        let response = client.get("/dashboard/historical?days=0").dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
        let response = client
            .get(format!("/dashboard/historical?days={}", u32::MAX))
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[test]
    fn history_window_bounds() {
        let now = Utc::now();
        assert_eq!(window_start(7, now).unwrap(), now - Duration::days(7));
        assert!(window_start(MAX_HISTORY_DAYS, now).is_ok());
        assert_eq!(
            window_start(0, now).unwrap_err().status(),
            Status::BadRequest
        );
        assert_eq!(
            window_start(u32::MAX, now).unwrap_err().status(),
            Status::BadRequest
        );
    }

    #[backend_test(voter)]
    async fn dashboard_is_admin_only(client: Client) {
        let response = client.get(uri!(dashboard)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
