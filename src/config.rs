use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::model::{
    db::admin::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};
use crate::voting::VotingRules;

/// Application settings read from `Rocket.toml` and `ROCKET_*` environment
/// variables, kept in managed state.
#[derive(Deserialize)]
pub struct Config {
    /// Seconds an auth cookie stays valid.
    auth_ttl: u32,
    /// Accept votes that name no election.
    #[serde(default)]
    legacy_voting: bool,
    jwt_secret: String,
}

impl Config {
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Rules applied to every submitted vote.
    pub fn voting_rules(&self) -> VotingRules {
        VotingRules {
            allow_unscoped: self.legacy_voting,
        }
    }
}

/// Pull a config section out of the figment, reporting failures in Rocket's
/// own format.
fn extract<T: DeserializeOwned>(rocket: &Rocket<Build>, what: &str) -> Option<T> {
    match rocket.figment().extract::<T>() {
        Ok(config) => Some(config),
        Err(e) => {
            error!("Failed to load {what} config");
            rocket::config::pretty_print_error(e);
            None
        }
    }
}

/// Loads [`Config`] into managed state at ignition.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<Config>(&rocket, "application") else {
            return Err(rocket);
        };
        if config.legacy_voting {
            info!("Legacy voting enabled: votes without an election are accepted");
        }
        Ok(rocket.manage(config))
    }
}

fn default_db_name() -> String {
    "stuvote".to_string()
}

#[derive(Deserialize)]
struct DbConfig {
    #[serde(default = "default_db_name")]
    db_name: String,
    db_uri: String,
}

impl DbConfig {
    /// Connect, then make sure indexes and a first admin account exist.
    async fn open(self) -> Result<(MongoClient, Database), String> {
        let client = MongoClient::with_uri_str(&self.db_uri)
            .await
            .map_err(|e| format!("Failed to connect to database: {e}"))?;
        let db = client.database(&self.db_name);
        ensure_indexes_exist(&db)
            .await
            .map_err(|e| format!("Failed to create indexes: {e}"))?;
        ensure_admin_exists(&Coll::from_db(&db))
            .await
            .map_err(|e| format!("Failed to create default admin: {e}"))?;
        Ok((client, db))
    }
}

/// Connects to MongoDB at ignition and manages both the `Client`, needed for
/// transactions, and the `Database`.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = extract::<DbConfig>(&rocket, "database") else {
            return Err(rocket);
        };
        info!("Connecting to database {}...", config.db_name);
        match config.open().await {
            Ok((client, db)) => {
                info!("...database connection online!");
                Ok(rocket.manage(client).manage(db))
            }
            Err(msg) => {
                error!("{msg}");
                Err(rocket)
            }
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn example() -> Self {
        Self {
            auth_ttl: 600,
            legacy_voting: false,
            jwt_secret: "test-only-secret".to_string(),
        }
    }
}
