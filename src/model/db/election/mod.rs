mod link;
mod settings;

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionStatus, mongodb::Id};

pub use link::{ElectionPosition, ElectionPositionCore, NewElectionPosition};
pub use settings::{ElectionSettings, ElectionSettingsCore, NewElectionSettings};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Voting opens at this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    /// Voting closes after this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    /// Last computed status. Recompute with [`ElectionCore::status_at`] before relying on it.
    pub status: ElectionStatus,
    /// Admin switch; an inactive election accepts no votes regardless of dates.
    pub is_active: bool,
}

impl ElectionCore {
    /// The status of this election at the given instant.
    pub fn status_at(&self, now: DateTime<Utc>) -> ElectionStatus {
        ElectionStatus::at(now, self.start_date, self.end_date)
    }

    /// Overwrite the stored status with the one implied by the dates.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        self.status = self.status_at(now);
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::{Duration, TimeZone};

    use super::*;

    impl ElectionCore {
        /// Student council election running 2025-01-01 to 2025-01-08, already activated.
        pub fn example() -> Self {
            let start_date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            let end_date = Utc.with_ymd_and_hms(2025, 1, 8, 0, 0, 0).unwrap();
            Self {
                title: "Student Council 2025".to_string(),
                description: "Annual student council election".to_string(),
                start_date,
                end_date,
                status: ElectionStatus::Ongoing,
                is_active: true,
            }
        }

        /// An active election open right now, for tests that go through the real clock.
        pub fn ongoing_example() -> Self {
            let now = Utc::now();
            Self {
                title: "Club Officers".to_string(),
                description: String::new(),
                start_date: now - Duration::days(1),
                end_date: now + Duration::days(6),
                status: ElectionStatus::Ongoing,
                is_active: true,
            }
        }

        /// An election that has not started yet.
        pub fn upcoming_example() -> Self {
            let now = Utc::now();
            Self {
                title: "Sports Captain".to_string(),
                description: String::new(),
                start_date: now + Duration::days(7),
                end_date: now + Duration::days(14),
                status: ElectionStatus::Upcoming,
                is_active: false,
            }
        }
    }
}
