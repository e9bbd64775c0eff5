use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::mongodb::{Coll, Id};

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Proof that the request comes from a logged-in user of type `U`.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Turn an optional token guard into a required one.
    ///
    /// Routes take `Option<AuthToken<U>>` so that a missing or invalid token
    /// answers `401 Unauthorized` rather than falling through to a 404.
    pub fn require(token: Option<Self>) -> Result<Self, Error> {
        token.ok_or_else(|| Error::Status(Status::Unauthorized, "Not authenticated".to_string()))
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    pub fn new(user: &U) -> Self {
        Self {
            id: user.id(),
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Sign this token into an HTTP-only cookie that expires after `auth_ttl`.
    #[allow(clippy::missing_panics_doc)]
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Verify and decode a token cookie. Tokens for other user types are refused.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token: Self = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;

        if token.rights != U::RIGHTS {
            return Err(Error::Status(
                Status::Forbidden,
                format!("Requires {} rights", U::RIGHTS),
            ));
        }
        Ok(token)
    }
}

/// JWT claims: the token plus its expiry.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User,
{
    type Error = Error;

    /// Forwards when there is no valid token for this user type, or the account
    /// it names is gone.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));
        let token: Self = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));

        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<U>::from_db(db)
            .count_documents(U::current(token.id), None)
            .await
        {
            Ok(0) => {
                debug!("Token for unknown or removed {} {}", token.rights, token.id);
                Outcome::Forward(())
            }
            Ok(_) => Outcome::Success(token),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::db::{
        admin::{Admin, AdminCore},
        voter::{Voter, VoterCore},
    };

    use super::*;

    fn voter() -> Voter {
        Voter {
            id: Id::new(),
            voter: VoterCore::example(),
        }
    }

    #[test]
    fn cookie_round_trip() {
        let config = Config::example();
        let voter = voter();

        let cookie = AuthToken::new(&voter).into_cookie(&config);
        assert!(cookie.http_only().unwrap_or(false));

        let token = AuthToken::<Voter>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(token.id, voter.id);
        assert_eq!(token.rights, Rights::Voter);
    }

    #[test]
    fn voter_token_is_not_admin() {
        let config = Config::example();
        let cookie = AuthToken::new(&voter()).into_cookie(&config);

        let err = AuthToken::<Admin>::from_cookie(&cookie, &config).err().unwrap();
        assert_eq!(err.status(), Status::Forbidden);
    }

    #[test]
    fn tampered_token_is_refused() {
        let config = Config::example();
        let admin = Admin {
            id: Id::new(),
            admin: AdminCore::example(),
        };
        let cookie = AuthToken::new(&admin).into_cookie(&config);
        let forged = Cookie::new(AUTH_TOKEN_COOKIE, format!("{}x", cookie.value()));

        assert!(AuthToken::<Admin>::from_cookie(&forged, &config).is_err());
    }
}
