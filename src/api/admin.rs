use mongodb::{bson::doc, options::FindOptions};
use rocket::{
    futures::TryStreamExt,
    http::Status,
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::{
    api::json_body,
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::AuthToken,
            envelope::{Data, Empty, Envelope, Reply},
        },
        db::admin::{Admin, NewAdmin},
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_admins, create_admin, delete_admin]
}

/// Usernames of every admin, in creation order.
#[get("/admins")]
async fn list_admins(
    token: Option<AuthToken<Admin>>,
    admins: Coll<Admin>,
) -> Result<Reply<Data<Vec<String>>>> {
    AuthToken::require(token)?;

    let oldest_first = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let usernames = admins
        .find(None, oldest_first)
        .await?
        .map_ok(|admin| admin.admin.username)
        .try_collect()
        .await?;
    Ok(Envelope::data(usernames).ok())
}

#[post("/admins", data = "<credentials>", format = "json")]
async fn create_admin(
    token: Option<AuthToken<Admin>>,
    credentials: std::result::Result<Json<AdminCredentials>, JsonError<'_>>,
    admins: Coll<NewAdmin>,
) -> Result<Reply<Empty>> {
    AuthToken::require(token)?;
    let credentials = json_body(credentials)?;

    let taken = admins
        .count_documents(doc! { "username": &credentials.username }, None)
        .await?;
    if taken > 0 {
        return Err(Error::Status(
            Status::Conflict,
            format!("Username {} is taken", credentials.username),
        ));
    }

    let admin = NewAdmin::try_from(credentials)?;
    admins.insert_one(admin, None).await?;
    Ok(Envelope::done("Admin created").created())
}

/// Remove an admin by username. The body is the username as a JSON string.
#[delete("/admins", data = "<username>", format = "json")]
async fn delete_admin(
    token: Option<AuthToken<Admin>>,
    username: std::result::Result<Json<String>, JsonError<'_>>,
    admins: Coll<Admin>,
) -> Result<Reply<Empty>> {
    AuthToken::require(token)?;
    let username = json_body(username)?;

    if admins.count_documents(None, None).await? <= 1 {
        return Err(Error::Status(
            Status::UnprocessableEntity,
            "The only remaining admin cannot be removed".to_string(),
        ));
    }

    let removed = admins
        .delete_one(doc! { "username": &username }, None)
        .await?
        .deleted_count;
    if removed == 0 {
        return Err(Error::not_found(format!("Admin {username}")));
    }
    Ok(Envelope::done("Admin deleted").ok())
}
