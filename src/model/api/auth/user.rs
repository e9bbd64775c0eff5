use std::fmt::{Display, Formatter};

use mongodb::bson::{doc, Document};
use serde::de::DeserializeOwned;
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{
    db::{admin::Admin, voter::Voter},
    mongodb::{Id, MongoCollection},
};

/// An account that can log in and hold an [`super::AuthToken`].
pub trait User: MongoCollection + DeserializeOwned + Unpin + Send + Sync {
    /// The rights granted to this kind of account.
    const RIGHTS: Rights;

    fn id(&self) -> Id;

    /// Filter matching the account with this ID, if it may still use the system.
    fn current(id: Id) -> Document {
        id.as_doc()
    }
}

/// Privilege levels, stored in tokens as a single byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Rights {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Admin => "admin",
        }
    }
}

impl Display for Rights {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl User for Voter {
    const RIGHTS: Rights = Rights::Voter;

    fn id(&self) -> Id {
        self.id
    }

    /// Removed voters keep their votes but lose access.
    fn current(id: Id) -> Document {
        doc! { "_id": id, "deleted": { "$ne": true } }
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_voters_are_not_current() {
        let id = Id::new();
        assert_eq!(Admin::current(id), id.as_doc());
        let filter = Voter::current(id);
        assert_eq!(filter.get_object_id("_id").unwrap(), *id);
        assert!(filter.get_document("deleted").is_ok());
    }
}
