use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Bson};
use rocket::form::FromFormField;
use serde::{Deserialize, Serialize};

/// Where an election is in its lifecycle, derived purely from its time window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    /// The election has not started yet.
    #[field(value = "UPCOMING")]
    Upcoming,
    /// Voting is open; both ends of the window are inclusive.
    #[field(value = "ONGOING")]
    Ongoing,
    /// The election has ended.
    #[field(value = "COMPLETED")]
    Completed,
}

impl ElectionStatus {
    /// The status of an election running from `start` to `end`, as seen at `now`.
    pub fn at(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if now < start {
            Self::Upcoming
        } else if now <= end {
            Self::Ongoing
        } else {
            Self::Completed
        }
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
