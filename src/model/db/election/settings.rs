use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::election::ResultsVisibility, mongodb::Id};

/// Per-election voting rules. Exactly one per election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSettingsCore {
    pub election_id: Id,
    pub allow_multiple_votes: bool,
    pub results_visibility: ResultsVisibility,
    pub require_verification: bool,
    pub allow_abstention: bool,
}

impl ElectionSettingsCore {
    /// The rules used when an election is created without explicit settings.
    pub fn defaults_for(election_id: Id) -> Self {
        Self {
            election_id,
            allow_multiple_votes: false,
            results_visibility: ResultsVisibility::Always,
            require_verification: true,
            allow_abstention: false,
        }
    }
}

/// Election settings without an ID.
pub type NewElectionSettings = ElectionSettingsCore;

/// Election settings from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSettings {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub settings: ElectionSettingsCore,
}

impl Deref for ElectionSettings {
    type Target = ElectionSettingsCore;

    fn deref(&self) -> &Self::Target {
        &self.settings
    }
}

impl DerefMut for ElectionSettings {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.settings
    }
}
