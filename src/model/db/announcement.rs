use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A notice attached to an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementCore {
    pub election_id: Id,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// An announcement without an ID.
pub type NewAnnouncement = AnnouncementCore;

/// An announcement from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub announcement: AnnouncementCore,
}

impl Deref for Announcement {
    type Target = AnnouncementCore;

    fn deref(&self) -> &Self::Target {
        &self.announcement
    }
}

impl DerefMut for Announcement {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.announcement
    }
}
