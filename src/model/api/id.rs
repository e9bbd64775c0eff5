use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

use mongodb::bson::oid::Error as OidError;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An ID as it appears in response bodies: a 24-character hex string.
///
/// Request bodies can deserialize straight to [`Id`], which also accepts the
/// extended JSON form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ApiId(Id);

impl Debug for ApiId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for ApiId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl TryFrom<String> for ApiId {
    type Error = OidError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        hex.parse().map(Self)
    }
}

impl From<ApiId> for String {
    fn from(id: ApiId) -> Self {
        id.to_string()
    }
}

impl From<Id> for ApiId {
    fn from(id: Id) -> Self {
        Self(id)
    }
}

impl Deref for ApiId {
    type Target = Id;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json::{self, json};

    use super::*;

    #[test]
    fn serializes_as_hex() {
        let id = Id::new();
        let api_id = ApiId::from(id);
        assert_eq!(serde_json::to_value(api_id).unwrap(), json!(id.to_string()));

        let back: ApiId = serde_json::from_value(json!(id.to_string())).unwrap();
        assert_eq!(*back, id);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(serde_json::from_value::<ApiId>(json!("not-an-id")).is_err());
    }
}
