use rocket::{
    http::Status,
    serde::json::{Error as JsonError, Json},
    Catcher, Request, Route,
};

use crate::error::{Error, Result};
use crate::model::api::envelope::{Empty, Envelope};

pub mod admin;
pub mod announcement;
pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod election;
pub mod voter;
pub mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(voter::routes());
    routes.extend(admin::routes());
    routes.extend(election::routes());
    routes.extend(catalog::routes());
    routes.extend(announcement::routes());
    routes.extend(voting::routes());
    routes.extend(dashboard::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}

/// Unwrap a JSON body, reporting malformed input as a bad request.
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonError<'_>>) -> Result<T> {
    match body {
        Ok(Json(body)) => Ok(body),
        Err(JsonError::Io(e)) => Err(Error::bad_request(format!("Failed to read body: {e}"))),
        Err(JsonError::Parse(_, e)) => {
            Err(Error::bad_request(format!("Invalid request body: {e}")))
        }
    }
}

/// Escape a user-supplied search term for use in a MongoDB regex.
pub(crate) fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[catch(400)]
fn bad_request() -> Json<Envelope<Empty>> {
    Json(Envelope::fail("Bad request"))
}

#[catch(401)]
fn unauthorized() -> Json<Envelope<Empty>> {
    Json(Envelope::fail("Not authenticated"))
}

#[catch(403)]
fn forbidden() -> Json<Envelope<Empty>> {
    Json(Envelope::fail("Not allowed"))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Envelope<Empty>> {
    Json(Envelope::fail(format!("No route for {} {}", req.method(), req.uri())))
}

#[catch(422)]
fn unprocessable() -> Json<Envelope<Empty>> {
    Json(Envelope::fail("Malformed request"))
}

#[catch(500)]
fn internal_error() -> (Status, Json<Envelope<Empty>>) {
    (
        Status::InternalServerError,
        Json(Envelope::error("Internal server error")),
    )
}

/// Database fixtures shared by the route tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use mongodb::Database;

    use crate::model::{
        db::{
            candidate::{Candidate, CandidateCore},
            election::{
                Election, ElectionCore, ElectionPositionCore, ElectionSettingsCore,
                NewElectionPosition, NewElectionSettings,
            },
            position::{Position, PositionCore},
        },
        mongodb::{Coll, Id},
    };

    /// IDs of a seeded election with one linked position and two candidates.
    pub struct Seeded {
        pub election: Id,
        pub position: Id,
        pub candidates: [Id; 2],
        /// A second position that is not linked to the election.
        pub unlinked_position: Id,
    }

    /// Insert `election` with default settings, a linked position with two
    /// candidates and an unlinked position.
    pub async fn seed(db: &Database, election: ElectionCore) -> Seeded {
        let election = Election {
            id: Id::new(),
            election,
        };
        Coll::<Election>::from_db(db)
            .insert_one(&election, None)
            .await
            .unwrap();
        Coll::<NewElectionSettings>::from_db(db)
            .insert_one(ElectionSettingsCore::defaults_for(election.id), None)
            .await
            .unwrap();

        let positions = [
            Position {
                id: Id::new(),
                position: PositionCore::example(),
            },
            Position {
                id: Id::new(),
                position: PositionCore::example2(),
            },
        ];
        Coll::<Position>::from_db(db)
            .insert_many(&positions, None)
            .await
            .unwrap();
        Coll::<NewElectionPosition>::from_db(db)
            .insert_one(
                ElectionPositionCore {
                    election_id: election.id,
                    position_id: positions[0].id,
                },
                None,
            )
            .await
            .unwrap();

        let candidates = [
            Candidate {
                id: Id::new(),
                candidate: CandidateCore::example(positions[0].id),
            },
            Candidate {
                id: Id::new(),
                candidate: CandidateCore::example2(positions[0].id),
            },
        ];
        Coll::<Candidate>::from_db(db)
            .insert_many(&candidates, None)
            .await
            .unwrap();

        Seeded {
            election: election.id,
            position: positions[0].id,
            candidates: [candidates[0].id, candidates[1].id],
            unlinked_position: positions[1].id,
        }
    }
}
