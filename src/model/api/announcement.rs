use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::announcement::{Announcement, AnnouncementCore, NewAnnouncement},
    mongodb::Id,
};

/// A new announcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementSpec {
    pub election_id: Id,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_published: bool,
}

impl AnnouncementSpec {
    pub fn into_announcement(self, now: DateTime<Utc>) -> Result<NewAnnouncement, String> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err("Announcement title and content are required".to_string());
        }
        Ok(NewAnnouncement {
            election_id: self.election_id,
            title: self.title.trim().to_string(),
            content: self.content,
            is_published: self.is_published,
            created_at: now,
        })
    }
}

/// A partial update to an announcement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_published: Option<bool>,
}

impl AnnouncementUpdate {
    pub fn apply(self, announcement: &mut AnnouncementCore) {
        if let Some(title) = self.title {
            announcement.title = title;
        }
        if let Some(content) = self.content {
            announcement.content = content;
        }
        if let Some(is_published) = self.is_published {
            announcement.is_published = is_published;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Announcement> for AnnouncementDescription {
    fn from(announcement: Announcement) -> Self {
        Self {
            id: announcement.id.into(),
            election_id: announcement.election_id.into(),
            title: announcement.announcement.title,
            content: announcement.announcement.content,
            is_published: announcement.announcement.is_published,
            created_at: announcement.announcement.created_at,
        }
    }
}

#[derive(Debug, Default, FromForm)]
pub struct AnnouncementQuery {
    #[field(name = "includeUnpublished")]
    pub include_unpublished: bool,
}
