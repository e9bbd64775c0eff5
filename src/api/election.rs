use chrono::{DateTime, Utc};
use log::info;
use mongodb::{
    bson::{doc, Document, Regex},
    options::FindOptions,
    Client, Database,
};
use rocket::{
    futures::TryStreamExt,
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    api::{escape_regex, json_body},
    error::{Error, Result},
    model::{
        api::{
            announcement::{AnnouncementDescription, AnnouncementQuery},
            auth::AuthToken,
            catalog::{CandidateDescription, PositionDescription},
            election::{
                ElectionDescription, ElectionListing, ElectionQuery, ElectionResults,
                ElectionSpec, ElectionSummary, ElectionUpdate, ElectionView, PositionIds,
                PositionWithCandidates, SettingsDescription, SettingsSpec,
            },
            envelope::{Data, Empty, Envelope, Reply},
            pagination::Pagination,
        },
        common::election::ElectionStatus,
        db::{
            admin::Admin,
            announcement::Announcement,
            election::{
                Election, ElectionPosition, ElectionPositionCore, ElectionSettings,
                ElectionSettingsCore, NewElection, NewElectionPosition, NewElectionSettings,
            },
            position::Position,
            vote::Vote,
            voter::Voter,
        },
        mongodb::{Coll, Id},
    },
    voting::report,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        get_election,
        create_election,
        update_election,
        delete_election,
        add_positions,
        remove_positions,
        update_settings,
        election_results,
        election_announcements,
    ]
}

#[get("/elections?<query..>")]
async fn list_elections(
    query: ElectionQuery,
    pagination: Pagination,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Reply<ElectionListing>> {
    let now = Utc::now();
    let filter = listing_filter(&query, now);

    let total = elections.count_documents(filter.clone(), None).await?;
    let options = FindOptions::builder()
        .sort(doc! { "start_date": -1 })
        .skip(pagination.skip())
        .limit(i64::try_from(pagination.limit()).unwrap_or(i64::MAX))
        .build();
    let page: Vec<Election> = elections.find(filter, options).await?.try_collect().await?;

    let mut summaries = Vec::with_capacity(page.len());
    for election in &page {
        summaries.push(summarize(db, election, now).await?);
    }

    Ok(Envelope::success(ElectionListing {
        elections: summaries,
        pagination: pagination.result(total),
    })
    .ok())
}

/// Filter matching the listing query. Status is judged from the dates, never the stored value.
fn listing_filter(query: &ElectionQuery, now: DateTime<Utc>) -> Document {
    let mut filter = Document::new();
    match query.status {
        Some(ElectionStatus::Upcoming) => {
            filter.insert("start_date", doc! { "$gt": now });
        }
        Some(ElectionStatus::Ongoing) => {
            filter.insert("start_date", doc! { "$lte": now });
            filter.insert("end_date", doc! { "$gte": now });
        }
        Some(ElectionStatus::Completed) => {
            filter.insert("end_date", doc! { "$lt": now });
        }
        None => {}
    }
    if let Some(active) = query.active {
        filter.insert("is_active", active);
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = Regex {
            pattern: escape_regex(search),
            options: "i".to_string(),
        };
        filter.insert(
            "$or",
            vec![
                doc! { "title": pattern.clone() },
                doc! { "description": pattern },
            ],
        );
    }
    filter
}

#[get("/elections/<election_id>")]
async fn get_election(
    election_id: Id,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Reply<Data<ElectionDescription>>> {
    let now = Utc::now();
    let election = find_election(&elections, election_id).await?;

    let positions = report::election_positions(db, election_id).await?;
    let position_ids: Vec<Id> = positions.iter().map(|position| position.id).collect();
    let mut candidates = report::standing_candidates(db, &position_ids).await?;
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    let positions = positions
        .iter()
        .map(|position| PositionWithCandidates {
            position: position.into(),
            candidates: candidates
                .iter()
                .filter(|candidate| candidate.position_id == position.id)
                .map(CandidateDescription::from)
                .collect(),
        })
        .collect();

    let published = doc! { "election_id": election_id, "is_published": true };
    let newest_first = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let announcements = Coll::<Announcement>::from_db(db)
        .find(published, newest_first)
        .await?
        .map_ok(AnnouncementDescription::from)
        .try_collect()
        .await?;

    let settings = settings_of(db, election_id).await?;
    Ok(Envelope::data(ElectionDescription {
        election: ElectionView::new(&election, now),
        settings: settings.as_ref().map(|settings| (&settings.settings).into()),
        positions,
        announcements,
        vote_count: vote_count(db, election_id).await?,
    })
    .ok())
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: Option<AuthToken<Admin>>,
    spec: std::result::Result<Json<ElectionSpec>, JsonError<'_>>,
    elections: Coll<Election>,
    settings: Coll<NewElectionSettings>,
    links: Coll<NewElectionPosition>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Reply<Data<ElectionSummary>>> {
    AuthToken::require(token)?;
    let spec = json_body(spec)?;
    spec.validate().map_err(Error::bad_request)?;

    let now = Utc::now();
    let (election, settings_spec, mut position_ids) = spec.into_parts(now);
    position_ids.sort();
    position_ids.dedup();
    ensure_positions_exist(db, &position_ids).await?;

    let election = Election {
        id: Id::new(),
        election,
    };
    let new_settings = settings_spec.map_or_else(
        || ElectionSettingsCore::defaults_for(election.id),
        |spec| spec.into_settings(election.id),
    );
    let new_links: Vec<NewElectionPosition> = position_ids
        .iter()
        .map(|&position_id| ElectionPositionCore {
            election_id: election.id,
            position_id,
        })
        .collect();

    // Atomically create the election with its settings and positions.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        elections
            .insert_one_with_session(&election, None, &mut session)
            .await?;
        settings
            .insert_one_with_session(&new_settings, None, &mut session)
            .await?;
        if !new_links.is_empty() {
            links
                .insert_many_with_session(&new_links, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
    }
    info!("Created election {} '{}'", election.id, election.title);

    Ok(Envelope::data(summarize(db, &election, now).await?)
        .message("Election created successfully")
        .created())
}

#[put("/elections/<election_id>", data = "<update>", format = "json")]
async fn update_election(
    token: Option<AuthToken<Admin>>,
    election_id: Id,
    update: std::result::Result<Json<ElectionUpdate>, JsonError<'_>>,
    elections: Coll<Election>,
    new_elections: Coll<NewElection>,
    db: &State<Database>,
) -> Result<Reply<Data<ElectionSummary>>> {
    AuthToken::require(token)?;
    let update = json_body(update)?;

    let now = Utc::now();
    let mut election = find_election(&elections, election_id).await?;
    update
        .apply(&mut election, now)
        .map_err(Error::bad_request)?;

    new_elections
        .replace_one(election_id.as_doc(), &election.election, None)
        .await?;

    Ok(Envelope::data(summarize(db, &election, now).await?)
        .message("Election updated successfully")
        .ok())
}

#[delete("/elections/<election_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_election(
    token: Option<AuthToken<Admin>>,
    election_id: Id,
    elections: Coll<Election>,
    announcements: Coll<Announcement>,
    links: Coll<ElectionPosition>,
    settings: Coll<ElectionSettings>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<Reply<Empty>> {
    AuthToken::require(token)?;
    find_election(&elections, election_id).await?;

    // Atomically delete the election and all associated data.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let filter = doc! {
            "election_id": election_id,
        };
        announcements
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        links
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        settings
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        let deleted_votes = votes
            .delete_many_with_session(filter, None, &mut session)
            .await?;
        elections
            .delete_one_with_session(election_id.as_doc(), None, &mut session)
            .await?;

        session.commit_transaction().await?;
        info!(
            "Deleted election {election_id} with {} votes",
            deleted_votes.deleted_count
        );
    }

    Ok(Envelope::done("Election deleted successfully").ok())
}

#[post("/elections/<election_id>/positions", data = "<positions>", format = "json")]
async fn add_positions(
    token: Option<AuthToken<Admin>>,
    election_id: Id,
    positions: std::result::Result<Json<PositionIds>, JsonError<'_>>,
    elections: Coll<Election>,
    links: Coll<NewElectionPosition>,
    db: &State<Database>,
) -> Result<Reply<Data<ElectionSummary>>> {
    AuthToken::require(token)?;
    let mut position_ids = position_list(positions)?;
    let election = find_election(&elections, election_id).await?;
    ensure_positions_exist(db, &position_ids).await?;

    let linked = linked_position_ids(db, election_id).await?;
    position_ids.retain(|position_id| !linked.contains(position_id));

    let message = if position_ids.is_empty() {
        "All positions are already added to this election".to_string()
    } else {
        let new_links: Vec<NewElectionPosition> = position_ids
            .iter()
            .map(|&position_id| ElectionPositionCore {
                election_id,
                position_id,
            })
            .collect();
        links.insert_many(&new_links, None).await?;
        format!("{} positions added to the election", new_links.len())
    };

    Ok(Envelope::data(summarize(db, &election, Utc::now()).await?)
        .message(message)
        .ok())
}

#[delete("/elections/<election_id>/positions", data = "<positions>", format = "json")]
async fn remove_positions(
    token: Option<AuthToken<Admin>>,
    election_id: Id,
    positions: std::result::Result<Json<PositionIds>, JsonError<'_>>,
    elections: Coll<Election>,
    links: Coll<ElectionPosition>,
    db: &State<Database>,
) -> Result<Reply<Data<ElectionSummary>>> {
    AuthToken::require(token)?;
    let position_ids = position_list(positions)?;
    let election = find_election(&elections, election_id).await?;

    let filter = doc! {
        "election_id": election_id,
        "position_id": { "$in": position_ids },
    };
    links.delete_many(filter, None).await?;

    Ok(Envelope::data(summarize(db, &election, Utc::now()).await?)
        .message("Positions removed from the election")
        .ok())
}

#[patch("/elections/<election_id>/settings", data = "<spec>", format = "json")]
async fn update_settings(
    token: Option<AuthToken<Admin>>,
    election_id: Id,
    spec: std::result::Result<Json<SettingsSpec>, JsonError<'_>>,
    elections: Coll<Election>,
    new_settings: Coll<NewElectionSettings>,
    db: &State<Database>,
) -> Result<Reply<Data<SettingsDescription>>> {
    AuthToken::require(token)?;
    let spec = json_body(spec)?;
    find_election(&elections, election_id).await?;

    let updated = match settings_of(db, election_id).await? {
        Some(mut existing) => {
            spec.apply(&mut existing.settings);
            new_settings
                .replace_one(existing.id.as_doc(), &existing.settings, None)
                .await?;
            existing.settings
        }
        None => {
            let created = spec.into_settings(election_id);
            new_settings.insert_one(&created, None).await?;
            created
        }
    };

    Ok(Envelope::data(SettingsDescription::from(&updated))
        .message("Election settings updated successfully")
        .ok())
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    admin: Option<AuthToken<Admin>>,
    voter: Option<AuthToken<Voter>>,
    election_id: Id,
    elections: Coll<Election>,
    db: &State<Database>,
) -> Result<Reply<Data<ElectionResults>>> {
    if admin.is_none() {
        AuthToken::require(voter)?;
    }

    let now = Utc::now();
    let election = find_election(&elections, election_id).await?;

    if admin.is_none() {
        let visibility = settings_of(db, election_id)
            .await?
            .map(|settings| settings.settings)
            .unwrap_or_else(|| ElectionSettingsCore::defaults_for(election_id))
            .results_visibility;
        visibility
            .permits_voter(now, election.end_date)
            .map_err(Error::forbidden)?;
    }

    let results = report::election_results(db, &election, now).await?;
    Ok(Envelope::data(results).ok())
}

#[get("/elections/<election_id>/announcements?<query..>")]
async fn election_announcements(
    admin: Option<AuthToken<Admin>>,
    election_id: Id,
    query: AnnouncementQuery,
    elections: Coll<Election>,
    announcements: Coll<Announcement>,
) -> Result<Reply<Data<Vec<AnnouncementDescription>>>> {
    find_election(&elections, election_id).await?;

    let mut filter = doc! { "election_id": election_id };
    if !(admin.is_some() && query.include_unpublished) {
        filter.insert("is_published", true);
    }
    let newest_first = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
    let found = announcements
        .find(filter, newest_first)
        .await?
        .map_ok(AnnouncementDescription::from)
        .try_collect()
        .await?;
    Ok(Envelope::data(found).ok())
}

pub(crate) async fn find_election(elections: &Coll<Election>, election_id: Id) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("Election".to_string()))
}

async fn settings_of(db: &Database, election_id: Id) -> Result<Option<ElectionSettings>> {
    Ok(Coll::<ElectionSettings>::from_db(db)
        .find_one(doc! { "election_id": election_id }, None)
        .await?)
}

async fn vote_count(db: &Database, election_id: Id) -> Result<u64> {
    Ok(Coll::<Vote>::from_db(db)
        .count_documents(doc! { "election_id": election_id }, None)
        .await?)
}

async fn linked_position_ids(db: &Database, election_id: Id) -> Result<Vec<Id>> {
    Ok(Coll::<ElectionPosition>::from_db(db)
        .find(doc! { "election_id": election_id }, None)
        .await?
        .map_ok(|link| link.position_id)
        .try_collect()
        .await?)
}

/// An election with its settings, positions and vote count.
async fn summarize(
    db: &Database,
    election: &Election,
    now: DateTime<Utc>,
) -> Result<ElectionSummary> {
    let positions = report::election_positions(db, election.id).await?;
    let settings = settings_of(db, election.id).await?;
    Ok(ElectionSummary {
        election: ElectionView::new(election, now),
        settings: settings.as_ref().map(|settings| (&settings.settings).into()),
        positions: positions.iter().map(PositionDescription::from).collect(),
        vote_count: vote_count(db, election.id).await?,
    })
}

/// A non-empty, duplicate-free list of position IDs from the request body.
fn position_list(body: std::result::Result<Json<PositionIds>, JsonError<'_>>) -> Result<Vec<Id>> {
    let mut position_ids = body
        .map(|Json(body)| body.position_ids)
        .unwrap_or_default();
    if position_ids.is_empty() {
        return Err(Error::bad_request("Please provide an array of position IDs"));
    }
    position_ids.sort();
    position_ids.dedup();
    Ok(position_ids)
}

/// Fail unless every position exists and has not been removed.
async fn ensure_positions_exist(db: &Database, position_ids: &[Id]) -> Result<()> {
    if position_ids.is_empty() {
        return Ok(());
    }
    let filter = doc! {
        "_id": { "$in": position_ids.to_vec() },
        "deleted": { "$ne": true },
    };
    let found = Coll::<Position>::from_db(db)
        .count_documents(filter, None)
        .await?;
    if found as usize != position_ids.len() {
        return Err(Error::not_found("One or more positions".to_string()));
    }
    Ok(())
}
