use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::{ElectionStatus, ResultsVisibility},
    db::election::{ElectionCore, ElectionSettingsCore, NewElection, NewElectionSettings},
    mongodb::Id,
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Positions contested in this election.
    #[serde(default)]
    pub position_ids: Vec<Id>,
    /// Voting rules; defaults apply when omitted.
    #[serde(default)]
    pub settings: Option<SettingsSpec>,
}

impl ElectionSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Election title is required".to_string());
        }
        if self.start_date >= self.end_date {
            return Err("End date must be after start date".to_string());
        }
        Ok(())
    }

    /// Split into the election itself, its settings spec and its positions.
    /// New elections start inactive.
    pub fn into_parts(self, now: DateTime<Utc>) -> (NewElection, Option<SettingsSpec>, Vec<Id>) {
        let election = ElectionCore {
            title: self.title.trim().to_string(),
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            status: ElectionStatus::at(now, self.start_date, self.end_date),
            is_active: false,
        };
        (election, self.settings, self.position_ids)
    }
}

/// Election settings as submitted by an admin. Every field is optional, so this
/// doubles as a partial update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSpec {
    pub allow_multiple_votes: Option<bool>,
    pub results_visibility: Option<ResultsVisibility>,
    pub require_verification: Option<bool>,
    pub allow_abstention: Option<bool>,
}

impl SettingsSpec {
    /// Settings for a new election. Explicitly supplied settings without a
    /// visibility hide results until the election ends.
    pub fn into_settings(self, election_id: Id) -> NewElectionSettings {
        let mut settings = ElectionSettingsCore::defaults_for(election_id);
        settings.results_visibility = ResultsVisibility::AfterEnd;
        self.apply(&mut settings);
        settings
    }

    /// Overwrite the given settings with every supplied field.
    pub fn apply(self, settings: &mut ElectionSettingsCore) {
        if let Some(allow_multiple_votes) = self.allow_multiple_votes {
            settings.allow_multiple_votes = allow_multiple_votes;
        }
        if let Some(results_visibility) = self.results_visibility {
            settings.results_visibility = results_visibility;
        }
        if let Some(require_verification) = self.require_verification {
            settings.require_verification = require_verification;
        }
        if let Some(allow_abstention) = self.allow_abstention {
            settings.allow_abstention = allow_abstention;
        }
    }
}

/// A partial update to an election.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl ElectionUpdate {
    /// Apply this update, recomputing the status from the resulting dates.
    /// The election is left untouched if the resulting window is empty.
    pub fn apply(self, election: &mut ElectionCore, now: DateTime<Utc>) -> Result<(), String> {
        let start_date = self.start_date.unwrap_or(election.start_date);
        let end_date = self.end_date.unwrap_or(election.end_date);
        if start_date >= end_date {
            return Err("End date must be after start date".to_string());
        }
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err("Election title cannot be empty".to_string());
            }
            election.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            election.description = description;
        }
        if let Some(is_active) = self.is_active {
            election.is_active = is_active;
        }
        election.start_date = start_date;
        election.end_date = end_date;
        election.refresh_status(now);
        Ok(())
    }
}

/// A list of positions to link to or unlink from an election.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionIds {
    pub position_ids: Vec<Id>,
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn rejects_empty_window() {
        let mut spec = ElectionSpec::example(vec![]);
        assert!(spec.validate().is_ok());
        spec.end_date = spec.start_date;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn settings_defaults() {
        let election_id = Id::new();

        let explicit = SettingsSpec {
            allow_multiple_votes: Some(true),
            ..Default::default()
        }
        .into_settings(election_id);
        assert!(explicit.allow_multiple_votes);
        assert!(explicit.require_verification);
        assert_eq!(explicit.results_visibility, ResultsVisibility::AfterEnd);

        let implicit = ElectionSettingsCore::defaults_for(election_id);
        assert!(!implicit.allow_multiple_votes);
        assert_eq!(implicit.results_visibility, ResultsVisibility::Always);
    }

    #[test]
    fn update_recomputes_status() {
        let now = Utc::now();
        let (mut election, _, _) = ElectionSpec::example(vec![]).into_parts(now);
        assert_eq!(election.status, ElectionStatus::Ongoing);
        assert!(!election.is_active);

        let update = ElectionUpdate {
            start_date: Some(now + Duration::days(1)),
            is_active: Some(true),
            ..Default::default()
        };
        update.apply(&mut election, now).unwrap();
        assert_eq!(election.status, ElectionStatus::Upcoming);
        assert!(election.is_active);
    }

    #[test]
    fn update_rejects_inverted_window() {
        let now = Utc::now();
        let (mut election, _, _) = ElectionSpec::example(vec![]).into_parts(now);
        let before = election.clone();

        let update = ElectionUpdate {
            end_date: Some(election.start_date - Duration::hours(1)),
            title: Some("Renamed".into()),
            ..Default::default()
        };
        assert!(update.apply(&mut election, now).is_err());
        assert_eq!(election, before);
    }
}
