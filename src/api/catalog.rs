use mongodb::{
    bson::{doc, Regex},
    options::FindOptions,
};
use rocket::{
    futures::TryStreamExt,
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::{
    api::{escape_regex, json_body},
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            catalog::{
                CandidateDescription, CandidateDetail, CandidateListing, CandidateQuery,
                CandidateSpec, CandidateUpdate, PositionDescription, PositionSpec,
            },
            envelope::{Data, Empty, Envelope, Reply},
        },
        db::{
            admin::Admin,
            candidate::{Candidate, NewCandidate},
            position::{NewPosition, Position},
        },
        mongodb::{Coll, Id},
    },
};

/// Candidates shown alongside a single candidate.
const RELATED_CANDIDATES: i64 = 3;

pub fn routes() -> Vec<Route> {
    routes![
        list_positions,
        create_position,
        delete_position,
        list_candidates,
        get_candidate,
        create_candidate,
        update_candidate,
        delete_candidate,
    ]
}

fn not_deleted() -> mongodb::bson::Document {
    doc! { "deleted": { "$ne": true } }
}

fn by_name() -> FindOptions {
    FindOptions::builder().sort(doc! { "name": 1 }).build()
}

#[get("/positions")]
async fn list_positions(
    positions: Coll<Position>,
) -> Result<Reply<Data<Vec<PositionDescription>>>> {
    let found = positions
        .find(not_deleted(), by_name())
        .await?
        .map_ok(|position| PositionDescription::from(&position))
        .try_collect()
        .await?;
    Ok(Envelope::data(found).ok())
}

#[post("/positions", data = "<spec>", format = "json")]
async fn create_position(
    token: Option<AuthToken<Admin>>,
    spec: std::result::Result<Json<PositionSpec>, JsonError<'_>>,
    positions: Coll<Position>,
) -> Result<Reply<Data<PositionDescription>>> {
    AuthToken::require(token)?;
    let position = Position {
        id: Id::new(),
        position: json_body(spec)?
            .into_position()
            .map_err(Error::bad_request)?,
    };
    positions.insert_one(&position, None).await?;
    Ok(Envelope::data(PositionDescription::from(&position))
        .message("Position created successfully")
        .created())
}

#[delete("/positions/<position_id>")]
async fn delete_position(
    token: Option<AuthToken<Admin>>,
    position_id: Id,
    positions: Coll<NewPosition>,
) -> Result<Reply<Empty>> {
    AuthToken::require(token)?;
    soft_delete(&positions, position_id, "Position").await?;
    Ok(Envelope::done("Position deleted successfully").ok())
}

#[get("/candidates?<query..>")]
async fn list_candidates(
    query: CandidateQuery,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
) -> Result<Reply<Data<CandidateListing>>> {
    let mut filter = not_deleted();
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filter.insert(
            "name",
            Regex {
                pattern: escape_regex(search),
                options: "i".to_string(),
            },
        );
    }
    if let Some(position_id) = query.position_id {
        filter.insert("position_id", position_id);
    }
    let found: Vec<Candidate> = candidates
        .find(filter, by_name())
        .await?
        .try_collect()
        .await?;
    let all_positions: Vec<Position> = positions
        .find(not_deleted(), by_name())
        .await?
        .try_collect()
        .await?;

    Ok(Envelope::data(CandidateListing::new(&all_positions, &found)).ok())
}

#[get("/candidates/<candidate_id>")]
async fn get_candidate(
    candidate_id: Id,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
) -> Result<Reply<Data<CandidateDetail>>> {
    let mut filter = not_deleted();
    filter.insert("_id", candidate_id);
    let candidate = candidates
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found("Candidate".to_string()))?;

    let position = positions
        .find_one(candidate.position_id.as_doc(), None)
        .await?;

    let competitors = doc! {
        "position_id": candidate.position_id,
        "_id": { "$ne": candidate.id },
        "deleted": { "$ne": true },
    };
    let options = FindOptions::builder()
        .sort(doc! { "name": 1 })
        .limit(RELATED_CANDIDATES)
        .build();
    let related = candidates
        .find(competitors, options)
        .await?
        .map_ok(|candidate| CandidateDescription::from(&candidate))
        .try_collect()
        .await?;

    Ok(Envelope::data(CandidateDetail {
        candidate: (&candidate).into(),
        position: position.as_ref().map(PositionDescription::from),
        related,
    })
    .ok())
}

#[post("/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    token: Option<AuthToken<Admin>>,
    spec: std::result::Result<Json<CandidateSpec>, JsonError<'_>>,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
) -> Result<Reply<Data<CandidateDescription>>> {
    AuthToken::require(token)?;
    let candidate = json_body(spec)?
        .into_candidate()
        .map_err(Error::bad_request)?;
    ensure_position_exists(&positions, candidate.position_id).await?;

    let candidate = Candidate {
        id: Id::new(),
        candidate,
    };
    candidates.insert_one(&candidate, None).await?;
    Ok(Envelope::data(CandidateDescription::from(&candidate))
        .message("Candidate created successfully")
        .created())
}

#[put("/candidates/<candidate_id>", data = "<update>", format = "json")]
async fn update_candidate(
    token: Option<AuthToken<Admin>>,
    candidate_id: Id,
    update: std::result::Result<Json<CandidateUpdate>, JsonError<'_>>,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
    positions: Coll<Position>,
) -> Result<Reply<Data<CandidateDescription>>> {
    AuthToken::require(token)?;
    let update = json_body(update)?;

    let mut filter = not_deleted();
    filter.insert("_id", candidate_id);
    let mut candidate = candidates
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found("Candidate".to_string()))?;

    if let Some(position_id) = update.position_id {
        ensure_position_exists(&positions, position_id).await?;
    }
    update.apply(&mut candidate).map_err(Error::bad_request)?;
    new_candidates
        .replace_one(candidate_id.as_doc(), &candidate.candidate, None)
        .await?;

    Ok(Envelope::data(CandidateDescription::from(&candidate))
        .message("Candidate updated successfully")
        .ok())
}

#[delete("/candidates/<candidate_id>")]
async fn delete_candidate(
    token: Option<AuthToken<Admin>>,
    candidate_id: Id,
    candidates: Coll<NewCandidate>,
) -> Result<Reply<Empty>> {
    AuthToken::require(token)?;
    soft_delete(&candidates, candidate_id, "Candidate").await?;
    Ok(Envelope::done("Candidate deleted successfully").ok())
}

/// Mark a document as deleted, failing if it is absent or already deleted.
async fn soft_delete<T>(collection: &Coll<T>, id: Id, what: &str) -> Result<()> {
    let mut filter = not_deleted();
    filter.insert("_id", id);
    let update = doc! { "$set": { "deleted": true } };
    let result = collection.update_one(filter, update, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(what.to_string()));
    }
    Ok(())
}

async fn ensure_position_exists(positions: &Coll<Position>, position_id: Id) -> Result<()> {
    let mut filter = not_deleted();
    filter.insert("_id", position_id);
    if positions.count_documents(filter, None).await? == 0 {
        return Err(Error::not_found("Position".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::model::db::{candidate::CandidateCore, position::PositionCore};

    use super::*;

    async fn insert_position(positions: &Coll<Position>, position: PositionCore) -> Id {
        let position = Position {
            id: Id::new(),
            position,
        };
        positions.insert_one(&position, None).await.unwrap();
        position.id
    }

    async fn insert_candidate(candidates: &Coll<Candidate>, candidate: CandidateCore) -> Id {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        candidates.insert_one(&candidate, None).await.unwrap();
        candidate.id
    }

    #[backend_test(admin)]
    async fn create_and_remove_position(client: Client, positions: Coll<Position>) {
        let response = client
            .post(uri!(create_position))
            .header(ContentType::JSON)
            .body(json!({ "name": "Secretary", "description": "Keeps minutes" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let body: Value = response.into_json().await.unwrap();
        let position_id: Id = body["data"]["id"].as_str().unwrap().parse().unwrap();

        let response = client
            .delete(uri!(delete_position(position_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Soft-deleted positions are kept but not listed.
        assert_eq!(positions.count_documents(None, None).await.unwrap(), 1);
        let response = client.get(uri!(list_positions)).dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"], json!([]));

        let response = client
            .delete(uri!(delete_position(position_id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidate_lifecycle(client: Client, positions: Coll<Position>) {
        let position_id = insert_position(&positions, PositionCore::example()).await;

        let spec = json!({
            "name": "Ada Obi",
            "profile": "https://images.example.org/ada.png",
            "positionId": position_id.to_string(),
        });
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(spec.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let body: Value = response.into_json().await.unwrap();
        let candidate_id: Id = body["data"]["id"].as_str().unwrap().parse().unwrap();

        let response = client
            .put(uri!(update_candidate(candidate_id)))
            .header(ContentType::JSON)
            .body(json!({ "description": "Fourth year" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["description"], "Fourth year");
        assert_eq!(body["data"]["name"], "Ada Obi");

        let response = client
            .delete(uri!(delete_candidate(candidate_id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client
            .get(uri!(get_candidate(candidate_id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn candidate_needs_position(client: Client, candidates: Coll<Candidate>) {
        let spec = json!({ "name": "Nobody", "positionId": Id::new().to_string() });
        let response = client
            .post(uri!(create_candidate))
            .header(ContentType::JSON)
            .body(spec.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn browse_candidates(
        client: Client,
        candidates: Coll<Candidate>,
        positions: Coll<Position>,
    ) {
        let president = insert_position(&positions, PositionCore::example()).await;
        let treasurer = insert_position(&positions, PositionCore::example2()).await;
        let ada = insert_candidate(&candidates, CandidateCore::example(president)).await;
        insert_candidate(&candidates, CandidateCore::example2(president)).await;
        let mut carla = CandidateCore::example(treasurer);
        carla.name = "Carla Diaz".to_string();
        insert_candidate(&candidates, carla).await;

        let response = client.get("/candidates").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["candidates"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["byPosition"].as_array().unwrap().len(), 2);

        let response = client.get("/candidates?search=ADA").dispatch().await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["candidates"][0]["name"], "Ada Obi");
        assert_eq!(body["data"]["candidates"].as_array().unwrap().len(), 1);

        let response = client
            .get(format!("/candidates?positionId={treasurer}"))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["candidates"][0]["name"], "Carla Diaz");

        let response = client.get(uri!(get_candidate(ada))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["position"]["name"], "President");
        assert_eq!(body["data"]["related"][0]["name"], "Ben Carter");
        assert_eq!(body["data"]["related"].as_array().unwrap().len(), 1);
    }

    #[backend_test(voter)]
    async fn voters_cannot_edit_catalog(client: Client, positions: Coll<Position>) {
        let response = client
            .post(uri!(create_position))
            .header(ContentType::JSON)
            .body(json!({ "name": "Secretary" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(positions.count_documents(None, None).await.unwrap(), 0);
    }
}
