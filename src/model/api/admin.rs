use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{api::auth::hash_password, db::admin::NewAdmin};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Username and plaintext password, as posted to the login and admin routes.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Hash the password. Blank usernames and short passwords are refused.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.trim().is_empty() || cred.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::Status(
                Status::BadRequest,
                format!(
                    "Username is required and password must be at least {MIN_PASSWORD_LENGTH} characters"
                ),
            ));
        }

        Ok(Self {
            password_hash: hash_password(&cred.password)?,
            username: cred.username,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        let cred = AdminCredentials {
            username: "someone".into(),
            password: "short".into(),
        };
        assert!(NewAdmin::try_from(cred).is_err());
        assert!(NewAdmin::try_from(AdminCredentials::empty()).is_err());
    }

    #[test]
    fn password_is_hashed() {
        let admin = NewAdmin::try_from(AdminCredentials::example1()).unwrap();
        assert_eq!(admin.username, AdminCredentials::example1().username);
        assert_ne!(admin.password_hash, AdminCredentials::example1().password);
        assert!(admin.verify_password(AdminCredentials::example1().password));
    }
}
