mod desc;
mod results;
mod spec;

pub use desc::{
    ElectionDescription, ElectionListing, ElectionQuery, ElectionSummary, ElectionView,
    PositionWithCandidates, SettingsDescription,
};
pub use results::{CandidateTally, ElectionResults, NamedRef, PositionTally, TallyReport};
pub use spec::{ElectionSpec, ElectionUpdate, PositionIds, SettingsSpec};
