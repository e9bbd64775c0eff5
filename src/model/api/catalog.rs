use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{
        candidate::{Candidate, CandidateCore, NewCandidate},
        position::{NewPosition, Position},
    },
    mongodb::Id,
};

/// A new position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PositionSpec {
    pub fn into_position(self) -> Result<NewPosition, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Position name is required".to_string());
        }
        Ok(NewPosition {
            name: name.to_string(),
            description: self.description,
            deleted: false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDescription {
    pub id: ApiId,
    pub name: String,
    pub description: String,
}

impl From<&Position> for PositionDescription {
    fn from(position: &Position) -> Self {
        Self {
            id: position.id.into(),
            name: position.name.clone(),
            description: position.description.clone(),
        }
    }
}

/// A new candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub description: String,
    pub position_id: Id,
}

impl CandidateSpec {
    pub fn into_candidate(self) -> Result<NewCandidate, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Candidate name is required".to_string());
        }
        Ok(NewCandidate {
            name: name.to_string(),
            profile: self.profile,
            description: self.description,
            position_id: self.position_id,
            deleted: false,
        })
    }
}

/// A partial update to a candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateUpdate {
    pub name: Option<String>,
    pub profile: Option<String>,
    pub description: Option<String>,
    pub position_id: Option<Id>,
}

impl CandidateUpdate {
    pub fn apply(self, candidate: &mut CandidateCore) -> Result<(), String> {
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err("Candidate name cannot be empty".to_string());
            }
            candidate.name = name.trim().to_string();
        }
        if let Some(profile) = self.profile {
            candidate.profile = profile;
        }
        if let Some(description) = self.description {
            candidate.description = description;
        }
        if let Some(position_id) = self.position_id {
            candidate.position_id = position_id;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub profile: String,
    pub description: String,
    pub position_id: ApiId,
}

impl From<&Candidate> for CandidateDescription {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.name.clone(),
            profile: candidate.profile.clone(),
            description: candidate.description.clone(),
            position_id: candidate.position_id.into(),
        }
    }
}

/// Candidates of one position.
#[derive(Debug, Serialize)]
pub struct CandidateGroup {
    pub position: PositionDescription,
    pub candidates: Vec<CandidateDescription>,
}

/// All matching candidates, plus the same candidates grouped by position.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateListing {
    pub candidates: Vec<CandidateDescription>,
    pub positions: Vec<PositionDescription>,
    pub by_position: Vec<CandidateGroup>,
}

impl CandidateListing {
    /// Group candidates under their positions, keeping the order of `positions`.
    /// Positions without matching candidates are omitted from the grouping.
    pub fn new(positions: &[Position], candidates: &[Candidate]) -> Self {
        let by_position = positions
            .iter()
            .filter_map(|position| {
                let members: Vec<_> = candidates
                    .iter()
                    .filter(|candidate| candidate.position_id == position.id)
                    .map(CandidateDescription::from)
                    .collect();
                (!members.is_empty()).then(|| CandidateGroup {
                    position: position.into(),
                    candidates: members,
                })
            })
            .collect();
        Self {
            candidates: candidates.iter().map(CandidateDescription::from).collect(),
            positions: positions.iter().map(PositionDescription::from).collect(),
            by_position,
        }
    }
}

/// A single candidate with its position and some competitors.
#[derive(Debug, Serialize)]
pub struct CandidateDetail {
    pub candidate: CandidateDescription,
    pub position: Option<PositionDescription>,
    pub related: Vec<CandidateDescription>,
}

#[derive(Debug, Default, FromForm)]
pub struct CandidateQuery {
    pub search: Option<String>,
    #[field(name = "positionId")]
    pub position_id: Option<Id>,
}
