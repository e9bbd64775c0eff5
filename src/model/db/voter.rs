use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A registered student.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Institution-issued student identifier, unique across voters.
    pub student_id: String,
    pub student_name: String,
    /// Unique contact address.
    pub email: String,
    pub password_hash: String,
    /// Soft-deleted voters cannot log in and do not count as eligible.
    #[serde(default)]
    pub deleted: bool,
}

impl VoterCore {
    /// Whether `password` matches the stored hash.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A voter account before insertion.
pub type NewVoter = VoterCore;

/// A stored voter account.
#[derive(Debug, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Fixture voters.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::api::voter::VoterRegistration;

    impl VoterCore {
        pub fn example() -> Self {
            Self::try_from(VoterRegistration::example()).unwrap()
        }

        pub fn example2() -> Self {
            Self::try_from(VoterRegistration::example2()).unwrap()
        }
    }
}
