use shared::models::*;
use shared::VoteError;
use thiserror::Error;
use uuid::Uuid;

/// Durable home of votes, options and ballots.
///
/// Each method is one atomic unit. Writes that depend on the vote's status
/// take the status they expect and fail with [`StoreError::StaleState`] when
/// another writer got there first.
#[rocket::async_trait]
pub trait VoteStore: Send + Sync {
    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError>;

    async fn find_vote(&self, id: Uuid) -> Result<Option<Vote>, StoreError>;

    async fn find_by_share_token(&self, token: &str) -> Result<Option<Vote>, StoreError>;

    /// Newest first.
    async fn list_votes(&self, status: Option<VoteStatus>) -> Result<Vec<Vote>, StoreError>;

    /// Persists status and lifecycle timestamps, provided the stored status
    /// still equals `expected`. Permission is left untouched.
    async fn save_state(&self, vote: &Vote, expected: VoteStatus) -> Result<(), StoreError>;

    /// Writes the permission alone. Fails with [`StoreError::StaleState`]
    /// once the vote has been deleted.
    async fn save_permission(&self, vote: &Vote) -> Result<(), StoreError>;

    /// Writes title, description, permission and the full option set of a
    /// Draft, discarding the previous options.
    async fn replace_draft(&self, vote: &Vote) -> Result<(), StoreError>;

    /// Inserts the ballot and bumps its option's counter together.
    ///
    /// The vote is re-read under lock and re-checked before writing. A second
    /// ballot for the same (vote, user) fails with [`StoreError::DuplicateBallot`].
    async fn record_ballot(&self, ballot: &VoteResponse) -> Result<(), StoreError>;

    async fn has_voted(&self, vote_id: Uuid, user: &UserId) -> Result<bool, StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("Failed to acquire store lock")]
    LockFailed,
    #[error("Ballot already recorded for this voter")]
    DuplicateBallot,
    #[error("Vote state changed concurrently")]
    StaleState,
    #[error("Ballot rejected: {0}")]
    BallotRejected(VoteError),
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<StoreError> for VoteError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => VoteError::NotFound,
            StoreError::DuplicateBallot => VoteError::AlreadyVoted,
            StoreError::BallotRejected(reason) => reason,
            StoreError::StaleState => {
                VoteError::invalid_transition("Vote was modified concurrently, please retry")
            }
            StoreError::LockFailed | StoreError::Database(_) => VoteError::Internal(e.to_string()),
        }
    }
}
