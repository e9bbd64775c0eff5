use mongodb::error::Error as DbError;
use rocket::http::Status;
use thiserror::Error;

/// Reasons a vote or batch of votes is refused.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("User not authenticated")]
    Unauthenticated,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("This election is not currently active")]
    ElectionInactive,
    #[error("Voting is not currently open for this election")]
    VotingWindowClosed,
    #[error("This position is not part of the specified election")]
    PositionNotInElection,
    #[error("Candidate does not belong to the specified position")]
    CandidateNotInPosition,
    #[error("You have already voted for this position in this election")]
    DuplicateVote,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("All votes must be for the same election")]
    MixedElections,
    #[error("Duplicate positions found in request")]
    DuplicatePositionsInRequest,
    #[error("You have already voted for some of these positions in this election")]
    AlreadyVoted,
    #[error(transparent)]
    Persistence(#[from] DbError),
}

impl VoteError {
    /// The HTTP status this refusal is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Unauthenticated => Status::Unauthorized,
            Self::NotFound(_) => Status::NotFound,
            Self::ElectionInactive | Self::VotingWindowClosed => Status::Forbidden,
            Self::PositionNotInElection
            | Self::CandidateNotInPosition
            | Self::DuplicateVote
            | Self::InvalidRequest(_)
            | Self::MixedElections
            | Self::DuplicatePositionsInRequest
            | Self::AlreadyVoted => Status::BadRequest,
            Self::Persistence(_) => Status::InternalServerError,
        }
    }
}
