use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Marks a position as contestable within an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPositionCore {
    pub election_id: Id,
    pub position_id: Id,
}

/// A link without an ID.
pub type NewElectionPosition = ElectionPositionCore;

/// A link from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionPosition {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub link: ElectionPositionCore,
}

impl Deref for ElectionPosition {
    type Target = ElectionPositionCore;

    fn deref(&self) -> &Self::Target {
        &self.link
    }
}
