use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::error;
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::model::{api::envelope::Envelope, mongodb::is_duplicate_key_error};
use crate::voting::VoteError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, reason.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, reason.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Db(err) if is_duplicate_key_error(err) => Status::Conflict,
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Vote(err) => err.status(),
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let body = if status.class() == StatusClass::ServerError {
            error!("{} {}: {self}", req.method(), req.uri());
            Envelope::error("Internal server error")
        } else if status == Status::Conflict {
            Envelope::fail("A record with these details already exists")
        } else {
            Envelope::fail(self.to_string())
        };
        (status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            Error::not_found("Election".to_string()).status(),
            Status::NotFound
        );
        assert_eq!(
            Error::from(VoteError::VotingWindowClosed).status(),
            Status::Forbidden
        );
        assert_eq!(
            Error::from(VoteError::DuplicateVote).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::from(VoteError::Unauthenticated).status(),
            Status::Unauthorized
        );
    }

    #[test]
    fn messages() {
        assert_eq!(
            Error::not_found("Election".to_string()).to_string(),
            "Election not found"
        );
        assert_eq!(
            Error::from(VoteError::NotFound("Election")).to_string(),
            "Election not found"
        );
    }
}
