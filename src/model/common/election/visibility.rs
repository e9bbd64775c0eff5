use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Who may see an election's results, and when.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultsVisibility {
    /// Only administrators can ever see the results.
    AdminOnly,
    /// Everyone can see the results once the election has ended.
    AfterEnd,
    /// Everyone can see the results at any time.
    #[default]
    Always,
}

impl ResultsVisibility {
    /// Check whether a non-admin may see results of an election ending at `end`.
    /// On refusal, the reason is returned.
    pub fn permits_voter(self, now: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), &'static str> {
        match self {
            Self::AdminOnly => Err("Election results are only visible to administrators"),
            Self::AfterEnd if now < end => {
                Err("Election results will be available after the election ends")
            }
            Self::AfterEnd | Self::Always => Ok(()),
        }
    }
}

impl From<ResultsVisibility> for Bson {
    fn from(visibility: ResultsVisibility) -> Self {
        to_bson(&visibility).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn voter_visibility() {
        let end = Utc::now();
        let before = end - Duration::hours(1);
        let after = end + Duration::hours(1);

        assert!(ResultsVisibility::AdminOnly.permits_voter(after, end).is_err());
        assert!(ResultsVisibility::AfterEnd.permits_voter(before, end).is_err());
        assert!(ResultsVisibility::AfterEnd.permits_voter(after, end).is_ok());
        assert!(ResultsVisibility::Always.permits_voter(before, end).is_ok());
    }
}
