use std::collections::HashSet;

use log::warn;
use mongodb::{bson::doc, error::Error as DbError, Client, Database};
use rocket::{
    futures::TryStreamExt,
    request::{self, FromRequest, Request},
    State,
};

use super::VoteError;
use crate::model::{
    db::{
        candidate::Candidate,
        election::{Election, ElectionPosition, ElectionSettings},
        position::Position,
        vote::{NewVote, Vote},
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

/// Everything the vote validator needs to read and write.
///
/// Inserts translate unique-index conflicts into [`VoteError::DuplicateVote`]
/// for single votes and [`VoteError::AlreadyVoted`] for batches. A batch is
/// all-or-nothing.
#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    async fn election(&self, election_id: Id) -> Result<Option<Election>, DbError>;

    async fn settings(&self, election_id: Id) -> Result<Option<ElectionSettings>, DbError>;

    /// Which of the given positions are linked to the election.
    async fn linked_positions(
        &self,
        election_id: Id,
        position_ids: &[Id],
    ) -> Result<HashSet<Id>, DbError>;

    /// Positions the voter has already voted for in the election.
    async fn voted_positions(&self, voter_id: Id, election_id: Id) -> Result<HashSet<Id>, DbError>;

    async fn position(&self, position_id: Id) -> Result<Option<Position>, DbError>;

    /// Candidates with the given IDs. Removed candidates are not returned.
    async fn candidates(&self, candidate_ids: &[Id]) -> Result<Vec<Candidate>, DbError>;

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote, VoteError>;

    /// Insert every vote or none, returning the number inserted.
    async fn insert_votes(&self, votes: Vec<NewVote>) -> Result<u64, VoteError>;
}

/// [`VoteStore`] over the application's MongoDB database.
pub struct MongoVoteStore {
    client: Client,
    db: Database,
}

impl MongoVoteStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }
}

#[rocket::async_trait]
impl VoteStore for MongoVoteStore {
    async fn election(&self, election_id: Id) -> Result<Option<Election>, DbError> {
        Coll::<Election>::from_db(&self.db)
            .find_one(election_id.as_doc(), None)
            .await
    }

    async fn settings(&self, election_id: Id) -> Result<Option<ElectionSettings>, DbError> {
        Coll::<ElectionSettings>::from_db(&self.db)
            .find_one(doc! { "election_id": election_id }, None)
            .await
    }

    async fn linked_positions(
        &self,
        election_id: Id,
        position_ids: &[Id],
    ) -> Result<HashSet<Id>, DbError> {
        let filter = doc! {
            "election_id": election_id,
            "position_id": { "$in": position_ids.iter().copied().collect::<Vec<_>>() },
        };
        let links: Vec<ElectionPosition> = Coll::<ElectionPosition>::from_db(&self.db)
            .find(filter, None)
            .await?
            .try_collect()
            .await?;
        Ok(links.into_iter().map(|link| link.position_id).collect())
    }

    async fn voted_positions(&self, voter_id: Id, election_id: Id) -> Result<HashSet<Id>, DbError> {
        let filter = doc! {
            "voter_id": voter_id,
            "election_id": election_id,
        };
        let votes: Vec<Vote> = Coll::<Vote>::from_db(&self.db)
            .find(filter, None)
            .await?
            .try_collect()
            .await?;
        Ok(votes.into_iter().map(|vote| vote.position_id).collect())
    }

    async fn position(&self, position_id: Id) -> Result<Option<Position>, DbError> {
        Coll::<Position>::from_db(&self.db)
            .find_one(position_id.as_doc(), None)
            .await
    }

    async fn candidates(&self, candidate_ids: &[Id]) -> Result<Vec<Candidate>, DbError> {
        let filter = doc! {
            "_id": { "$in": candidate_ids.iter().copied().collect::<Vec<_>>() },
            "deleted": { "$ne": true },
        };
        Coll::<Candidate>::from_db(&self.db)
            .find(filter, None)
            .await?
            .try_collect()
            .await
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote, VoteError> {
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        match Coll::<Vote>::from_db(&self.db).insert_one(&vote, None).await {
            Ok(_) => Ok(vote),
            Err(err) if is_duplicate_key_error(&err) => Err(VoteError::DuplicateVote),
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_votes(&self, votes: Vec<NewVote>) -> Result<u64, VoteError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let inserted = Coll::<NewVote>::from_db(&self.db)
            .insert_many_with_session(&votes, None, &mut session)
            .await;
        let result = match inserted {
            Ok(result) => session
                .commit_transaction()
                .await
                .map(|_| result.inserted_ids.len() as u64),
            Err(err) => {
                // Dropping the session would also abort, but do it eagerly.
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort vote transaction: {abort_err}");
                }
                Err(err)
            }
        };

        result.map_err(|err| {
            if is_duplicate_key_error(&err) {
                VoteError::AlreadyVoted
            } else {
                err.into()
            }
        })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for MongoVoteStore {
    type Error = ();

    /// Panics iff the MongoDB [`Client`] and [`Database`] are not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let client = req.guard::<&State<Client>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Self::new(client.inner().clone(), db.inner().clone()))
    }
}
