use chrono::Utc;
use rocket::{
    serde::json::{Error as JsonError, Json},
    Route,
};

use crate::{
    api::{election::find_election, json_body},
    error::{Error, Result},
    model::{
        api::{
            announcement::{AnnouncementDescription, AnnouncementSpec, AnnouncementUpdate},
            auth::AuthToken,
            envelope::{Data, Empty, Envelope, Reply},
        },
        db::{
            admin::Admin,
            announcement::{Announcement, NewAnnouncement},
            election::Election,
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![create_announcement, update_announcement, delete_announcement]
}

#[post("/announcements", data = "<spec>", format = "json")]
async fn create_announcement(
    token: Option<AuthToken<Admin>>,
    spec: std::result::Result<Json<AnnouncementSpec>, JsonError<'_>>,
    elections: Coll<Election>,
    announcements: Coll<Announcement>,
) -> Result<Reply<Data<AnnouncementDescription>>> {
    AuthToken::require(token)?;
    let spec = json_body(spec)?;
    find_election(&elections, spec.election_id).await?;

    let announcement = Announcement {
        id: Id::new(),
        announcement: spec
            .into_announcement(Utc::now())
            .map_err(Error::bad_request)?,
    };
    announcements.insert_one(&announcement, None).await?;

    Ok(Envelope::data(announcement.into())
        .message("Announcement created successfully")
        .created())
}

#[patch("/announcements/<announcement_id>", data = "<update>", format = "json")]
async fn update_announcement(
    token: Option<AuthToken<Admin>>,
    announcement_id: Id,
    update: std::result::Result<Json<AnnouncementUpdate>, JsonError<'_>>,
    announcements: Coll<Announcement>,
    new_announcements: Coll<NewAnnouncement>,
) -> Result<Reply<Data<AnnouncementDescription>>> {
    AuthToken::require(token)?;
    let update = json_body(update)?;

    let mut announcement = announcements
        .find_one(announcement_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("Announcement".to_string()))?;
    update.apply(&mut announcement);
    new_announcements
        .replace_one(announcement_id.as_doc(), &announcement.announcement, None)
        .await?;

    Ok(Envelope::data(announcement.into())
        .message("Announcement updated successfully")
        .ok())
}

#[delete("/announcements/<announcement_id>")]
async fn delete_announcement(
    token: Option<AuthToken<Admin>>,
    announcement_id: Id,
    announcements: Coll<Announcement>,
) -> Result<Reply<Empty>> {
    AuthToken::require(token)?;
    let result = announcements
        .delete_one(announcement_id.as_doc(), None)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found("Announcement".to_string()));
    }
    Ok(Envelope::done("Announcement deleted successfully").ok())
}
