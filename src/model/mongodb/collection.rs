use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    analytics::{AnalyticsSnapshot, NewAnalyticsSnapshot},
    announcement::{Announcement, NewAnnouncement},
    candidate::{Candidate, NewCandidate},
    election::{
        Election, ElectionPosition, ElectionSettings, NewElection, NewElectionPosition,
        NewElectionSettings,
    },
    position::{NewPosition, Position},
    vote::{NewVote, Vote},
    voter::{NewVoter, Voter},
};

/// A document type stored in a named collection.
pub trait MongoCollection {
    const NAME: &'static str;
}

/// A typed collection handle, usable as a request guard.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// Manual impl: deriving would demand `T: Clone`.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Panics if no [`Database`] is managed.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Self::from_db(db))
    }
}

/// Implement [`MongoCollection`] for each listed type, all sharing one collection name.
macro_rules! collection {
    ($name:literal: $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

collection!("admins": Admin, NewAdmin);
collection!("voters": Voter, NewVoter);
collection!("elections": Election, NewElection);
collection!("election_settings": ElectionSettings, NewElectionSettings);
collection!("election_positions": ElectionPosition, NewElectionPosition);
collection!("positions": Position, NewPosition);
collection!("candidates": Candidate, NewCandidate);
collection!("votes": Vote, NewVote);
collection!("announcements": Announcement, NewAnnouncement);
collection!("analytics": AnalyticsSnapshot, NewAnalyticsSnapshot);

async fn index<T: MongoCollection>(
    db: &Database,
    keys: Document,
    options: Option<IndexOptions>,
) -> Result<(), DbError> {
    let model = IndexModel::builder().keys(keys).options(options).build();
    Coll::<T>::from_db(db).create_index(model, None).await?;
    Ok(())
}

/// Create every index the collections rely on. Safe to call repeatedly.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Creating indexes");
    let unique = || Some(IndexOptions::builder().unique(true).build());

    index::<Admin>(db, doc! { "username": 1 }, unique()).await?;
    // Either the student ID or the email identifies a voter.
    index::<Voter>(db, doc! { "student_id": 1 }, unique()).await?;
    index::<Voter>(db, doc! { "email": 1 }, unique()).await?;
    index::<ElectionSettings>(db, doc! { "election_id": 1 }, unique()).await?;
    index::<ElectionPosition>(db, doc! { "election_id": 1, "position_id": 1 }, unique()).await?;

    // Only votes cast under single-vote rules carry an exclusive key, so a
    // sparse unique index gives one vote per (voter, election, position)
    // exactly where it is required.
    let sparse_unique = IndexOptions::builder().unique(true).sparse(true).build();
    index::<Vote>(db, doc! { "exclusive_key": 1 }, Some(sparse_unique)).await?;
    index::<Vote>(db, doc! { "election_id": 1, "voter_id": 1 }, None).await?;

    Ok(())
}
