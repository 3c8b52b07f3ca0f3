//! Ballot preconditions that depend only on the vote itself.
//!
//! Existence and the per-identity uniqueness check need the store and live
//! in the backend. The store calls [`check_open_for_ballot`] again inside
//! its write so a concurrent close cannot slip a ballot in.

use uuid::Uuid;
use crate::error::VoteError;
use crate::lifecycle::Entry;
use crate::models::{Vote, VotePermission, VoteStatus};

pub fn check_share_token(vote: &Vote, entry: Entry<'_>) -> Result<(), VoteError> {
    match entry {
        Entry::ShareLink(token)
            if vote.permission == VotePermission::LinkOnly && token != Some(vote.share_token.as_str()) =>
        {
            Err(VoteError::forbidden("Invalid share token"))
        }
        _ => Ok(()),
    }
}

pub fn check_open_for_ballot(vote: &Vote, option_id: Uuid) -> Result<(), VoteError> {
    match vote.status {
        VoteStatus::Draft | VoteStatus::Deleted => return Err(VoteError::NotPublished),
        VoteStatus::Closed => return Err(VoteError::VoteClosed),
        VoteStatus::Published => {}
    }
    if vote.closed_at.is_some() {
        return Err(VoteError::VoteClosed);
    }
    if vote.option(option_id).is_none() {
        return Err(VoteError::InvalidOption);
    }
    Ok(())
}

/// Share token first, then the open-for-ballot checks.
pub fn check_ballot(vote: &Vote, option_id: Uuid, entry: Entry<'_>) -> Result<(), VoteError> {
    check_share_token(vote, entry)?;
    check_open_for_ballot(vote, option_id)
}
