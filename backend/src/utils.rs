use crate::error::ApiError;
use shared::VoteError;
use uuid::Uuid;

pub fn parse_vote_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId)
}

/// An option id that is not even a UUID cannot belong to the vote.
pub fn parse_option_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::Vote(VoteError::InvalidOption))
}
