use std::ops::{Deref, DerefMut};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::admin::AdminCredentials,
    mongodb::{Coll, Id},
};

/// Username of the admin created on an empty deployment.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Initial password of the default admin.
const DEFAULT_ADMIN_PASSWORD: &str = "changeme123";

/// Admin login details as stored: the username and an argon2 hash.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Whether `password` matches the stored hash.
    /// A malformed stored hash never verifies.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin account before insertion.
pub type NewAdmin = AdminCore;

/// A stored admin account.
#[derive(Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Create the default admin if no admins exist, so a fresh deployment can be logged into.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>) -> Result<()> {
    if admins.count_documents(None, None).await? > 0 {
        return Ok(());
    }

    let admin: NewAdmin = AdminCredentials {
        username: DEFAULT_ADMIN_USERNAME.to_string(),
        password: DEFAULT_ADMIN_PASSWORD.to_string(),
    }
    .try_into()?;
    admins.insert_one(&admin, None).await?;
    warn!(
        "No admins found, created default admin '{}'; change its password",
        admin.username
    );
    Ok(())
}
