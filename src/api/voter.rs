use mongodb::bson::doc;
use rocket::{
    http::Status,
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::{
    api::json_body,
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            envelope::{Data, Envelope, Reply},
            voter::{VoterProfile, VoterRegistration},
        },
        db::voter::{NewVoter, Voter},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, profile]
}

#[post("/voters", data = "<registration>", format = "json")]
async fn register(
    registration: std::result::Result<Json<VoterRegistration>, JsonError<'_>>,
    new_voters: Coll<NewVoter>,
    voters: Coll<Voter>,
) -> Result<Reply<Data<VoterProfile>>> {
    let voter: NewVoter = json_body(registration)?.try_into()?;

    // Check identifier uniqueness; the unique indexes catch any race.
    let filter = doc! {
        "$or": [
            { "student_id": &voter.student_id },
            { "email": &voter.email },
        ]
    };
    if voters.find_one(filter, None).await?.is_some() {
        return Err(Error::Status(
            Status::Conflict,
            "A voter with this student ID or email already exists".to_string(),
        ));
    }

    let id = new_voters.insert_one(&voter, None).await?.inserted_id;
    let voter = voters
        .find_one(doc! { "_id": id }, None)
        .await?
        .ok_or_else(|| Error::not_found("Voter".to_string()))?;

    Ok(Envelope::data(voter.into())
        .message("Registration successful")
        .created())
}

#[get("/voters/me")]
async fn profile(
    token: Option<AuthToken<Voter>>,
    voters: Coll<Voter>,
) -> Result<Reply<Data<VoterProfile>>> {
    let token = AuthToken::require(token)?;
    let voter = voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {}", token.id)))?;
    Ok(Envelope::data(voter.into()).ok())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use super::*;

    #[backend_test]
    async fn register_voter(client: Client, voters: Coll<Voter>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(VoterRegistration::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Created, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["studentId"], "S1001");
        assert!(body["data"].get("passwordHash").is_none());

        let stored = voters
            .find_one(doc! { "student_id": "S1001" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email, "grace@uni.example.org");
        assert!(stored.verify_password(VoterRegistration::example().password));
    }

    #[backend_test]
    async fn register_duplicate_student_id(client: Client, voters: Coll<NewVoter>) {
        voters.insert_one(NewVoter::example(), None).await.unwrap();

        let mut registration = VoterRegistration::example2();
        registration.student_id = VoterRegistration::example().student_id;
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(registration).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Conflict, response.status());
        assert_eq!(voters.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test]
    async fn register_invalid(client: Client, voters: Coll<NewVoter>) {
        let mut registration = VoterRegistration::example();
        registration.password = "short".into();
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(registration).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(voters.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(voter)]
    async fn own_profile(client: Client) {
        let response = client.get(uri!(profile)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["data"]["studentName"], "Grace Mensah");
    }

    #[backend_test(admin)]
    async fn profile_needs_voter(client: Client) {
        let response = client.get(uri!(profile)).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
