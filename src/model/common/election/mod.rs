mod state;
mod visibility;

pub use state::ElectionStatus;
pub use visibility::ResultsVisibility;
