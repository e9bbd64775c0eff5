use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    api::{admin::MIN_PASSWORD_LENGTH, auth::hash_password, id::ApiId},
    db::voter::{NewVoter, Voter},
};

/// A student registering to vote.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterRegistration {
    pub student_id: String,
    pub student_name: String,
    pub email: String,
    pub password: String,
}

impl VoterRegistration {
    /// Check required fields are present and well-formed.
    pub fn validate(&self) -> Result<(), String> {
        if self.student_id.trim().is_empty() || self.student_name.trim().is_empty() {
            return Err("Student ID and name are required".to_string());
        }
        let valid_email = self
            .email
            .split_once('@')
            .map_or(false, |(user, domain)| !user.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(format!("Invalid email address: {}", self.email));
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            ));
        }
        Ok(())
    }
}

impl TryFrom<VoterRegistration> for NewVoter {
    type Error = Error;

    fn try_from(registration: VoterRegistration) -> Result<Self, Self::Error> {
        registration
            .validate()
            .map_err(|reason| Error::Status(Status::BadRequest, reason))?;
        Ok(Self {
            password_hash: hash_password(&registration.password)?,
            student_id: registration.student_id.trim().to_string(),
            student_name: registration.student_name.trim().to_string(),
            email: registration.email.trim().to_lowercase(),
            deleted: false,
        })
    }
}

/// Voter login details.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterCredentials {
    pub student_id: String,
    pub password: String,
}

/// What a voter can see about themselves.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterProfile {
    pub id: ApiId,
    pub student_id: String,
    pub student_name: String,
    pub email: String,
}

impl From<Voter> for VoterProfile {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id.into(),
            student_id: voter.voter.student_id,
            student_name: voter.voter.student_name,
            email: voter.voter.email,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl VoterRegistration {
        pub fn example() -> Self {
            Self {
                student_id: "S1001".into(),
                student_name: "Grace Mensah".into(),
                email: "grace@uni.example.org".into(),
                password: "correcthorse".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                student_id: "S1002".into(),
                student_name: "Tomas Ruiz".into(),
                email: "tomas@uni.example.org".into(),
                password: "batterystaple".into(),
            }
        }
    }

    impl VoterCredentials {
        pub fn example() -> Self {
            let registration = VoterRegistration::example();
            Self {
                student_id: registration.student_id,
                password: registration.password,
            }
        }
    }
}
