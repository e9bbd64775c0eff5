use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    api::json_body,
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::{AuthToken, User, AUTH_TOKEN_COOKIE},
            envelope::{Data, Empty, Envelope, Reply},
            voter::{VoterCredentials, VoterProfile},
        },
        db::{admin::Admin, voter::Voter},
        mongodb::Coll,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![admin_login, voter_login, logout]
}

fn set_token<U: User>(cookies: &CookieJar<'_>, config: &Config, user: &U) {
    cookies.add(AuthToken::new(user).into_cookie(config));
}

fn bad_login(message: &str) -> Error {
    Error::Status(Status::Unauthorized, message.to_string())
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
pub async fn admin_login(
    cookies: &CookieJar<'_>,
    credentials: std::result::Result<Json<AdminCredentials>, JsonError<'_>>,
    admins: Coll<Admin>,
    config: &State<Config>,
) -> Result<Reply<Empty>> {
    let AdminCredentials { username, password } = json_body(credentials)?;

    let admin = admins
        .find_one(doc! { "username": &username }, None)
        .await?
        .filter(|admin| admin.verify_password(&password))
        .ok_or_else(|| bad_login("Invalid username or password"))?;
    set_token(cookies, config, &admin);

    Ok(Envelope::done("Logged in").ok())
}

/// Log a voter in by student ID. Removed voters are treated as unknown.
#[post("/auth/voter", data = "<credentials>", format = "json")]
pub async fn voter_login(
    cookies: &CookieJar<'_>,
    credentials: std::result::Result<Json<VoterCredentials>, JsonError<'_>>,
    voters: Coll<Voter>,
    config: &State<Config>,
) -> Result<Reply<Data<VoterProfile>>> {
    let credentials = json_body(credentials)?;
    let active_student = doc! {
        "student_id": credentials.student_id.trim(),
        "deleted": { "$ne": true },
    };

    let voter = voters
        .find_one(active_student, None)
        .await?
        .filter(|voter| voter.verify_password(&credentials.password))
        .ok_or_else(|| bad_login("Invalid student ID or password"))?;
    set_token(cookies, config, &voter);

    Ok(Envelope::data(voter.into()).message("Logged in").ok())
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar) -> Reply<Empty> {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Envelope::done("Logged out").ok()
}
