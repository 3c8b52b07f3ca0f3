use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use shared::models::*;
use shared::participation::check_open_for_ballot;
use tracing::error;
use uuid::Uuid;
use crate::store::{StoreError, VoteStore};

#[derive(Debug, Default)]
struct Tables {
    votes: HashMap<Uuid, Vote>,
    ballots: Vec<VoteResponse>,
    // unique index on (vote, user); anonymous ballots never enter it
    voters: HashSet<(Uuid, UserId)>,
}

/// In-process store. One mutex covers every table, so each call is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|e| {
            error!("Failed to acquire store lock: {}", e);
            StoreError::LockFailed
        })
    }

    /// Every ballot recorded for a vote, in insertion order.
    pub fn ballots_for(&self, vote_id: Uuid) -> Result<Vec<VoteResponse>, StoreError> {
        Ok(self.lock()?
            .ballots
            .iter()
            .filter(|ballot| ballot.vote_id == vote_id)
            .cloned()
            .collect())
    }
}

#[rocket::async_trait]
impl VoteStore for MemoryStore {
    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.votes.values().any(|existing| existing.share_token == vote.share_token) {
            return Err(StoreError::Database("duplicate share token".into()));
        }
        tables.votes.insert(vote.id, vote.clone());
        Ok(())
    }

    async fn find_vote(&self, id: Uuid) -> Result<Option<Vote>, StoreError> {
        Ok(self.lock()?.votes.get(&id).cloned())
    }

    async fn find_by_share_token(&self, token: &str) -> Result<Option<Vote>, StoreError> {
        Ok(self.lock()?
            .votes
            .values()
            .find(|vote| vote.share_token == token)
            .cloned())
    }

    async fn list_votes(&self, status: Option<VoteStatus>) -> Result<Vec<Vote>, StoreError> {
        let tables = self.lock()?;
        let mut votes: Vec<Vote> = tables
            .votes
            .values()
            .filter(|vote| status.map_or(true, |s| vote.status == s))
            .cloned()
            .collect();
        votes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(votes)
    }

    async fn save_state(&self, vote: &Vote, expected: VoteStatus) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let stored = tables.votes.get_mut(&vote.id).ok_or(StoreError::NotFound)?;
        if stored.status != expected {
            return Err(StoreError::StaleState);
        }
        stored.status = vote.status;
        stored.published_at = vote.published_at;
        stored.closed_at = vote.closed_at;
        Ok(())
    }

    async fn save_permission(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let stored = tables.votes.get_mut(&vote.id).ok_or(StoreError::NotFound)?;
        if stored.status == VoteStatus::Deleted {
            return Err(StoreError::StaleState);
        }
        stored.permission = vote.permission;
        Ok(())
    }

    async fn replace_draft(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let stored = tables.votes.get_mut(&vote.id).ok_or(StoreError::NotFound)?;
        if stored.status != VoteStatus::Draft {
            return Err(StoreError::StaleState);
        }
        stored.title = vote.title.clone();
        stored.description = vote.description.clone();
        stored.permission = vote.permission;
        stored.options = vote.options.clone();
        Ok(())
    }

    async fn record_ballot(&self, ballot: &VoteResponse) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let Tables { votes, ballots, voters } = &mut *tables;

        let vote = votes.get_mut(&ballot.vote_id).ok_or(StoreError::NotFound)?;
        check_open_for_ballot(vote, ballot.option_id).map_err(StoreError::BallotRejected)?;

        if let Some(user) = &ballot.user_id {
            if !voters.insert((ballot.vote_id, user.clone())) {
                return Err(StoreError::DuplicateBallot);
            }
        }

        // checked above
        if let Some(option) = vote.options.iter_mut().find(|o| o.id == ballot.option_id) {
            option.vote_count += 1;
        }
        ballots.push(ballot.clone());
        Ok(())
    }

    async fn has_voted(&self, vote_id: Uuid, user: &UserId) -> Result<bool, StoreError> {
        Ok(self.lock()?.voters.contains(&(vote_id, user.clone())))
    }
}
