use std::sync::Arc;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use shared::lifecycle::{resolve_viewable, Entry};
use shared::participation::{check_ballot, check_share_token, check_open_for_ballot};
use shared::{models::*, Identity, Tally, VoteError, VoteView, compute_tally};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use crate::store::{StoreError, VoteStore};

const SHARE_TOKEN_BYTES: usize = 32;

/// Entry point for every vote operation.
///
/// Lifecycle rules and ballot preconditions come from `shared`; this type
/// loads and persists around them and renders views for the caller.
#[derive(Clone)]
pub struct VoteProcessor {
    store: Arc<dyn VoteStore>,
    rng: SystemRandom,
    allow_anonymous_share: bool,
}

impl VoteProcessor {
    pub fn new(store: Arc<dyn VoteStore>, allow_anonymous_share: bool) -> Self {
        Self {
            store,
            rng: SystemRandom::new(),
            allow_anonymous_share,
        }
    }

    fn generate_share_token(&self) -> Result<String, VoteError> {
        let mut bytes = [0u8; SHARE_TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| VoteError::Internal("failed to generate share token".into()))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    async fn load(&self, id: Uuid) -> Result<Vote, VoteError> {
        self.store.find_vote(id).await?.ok_or(VoteError::NotFound)
    }

    async fn has_voted(&self, vote: &Vote, viewer: &Identity) -> Result<bool, VoteError> {
        match viewer.user_id() {
            Some(user) => Ok(self.store.has_voted(vote.id, user).await?),
            None => Ok(false),
        }
    }

    async fn render(&self, vote: &Vote, viewer: &Identity, reached_by_token: bool) -> Result<VoteView, VoteError> {
        let has_voted = self.has_voted(vote, viewer).await?;
        Ok(VoteView::render(vote, viewer, has_voted, reached_by_token))
    }

    /// Applies a lifecycle step and saves it against the status it started from.
    ///
    /// If another writer changed the status in between, the step is replayed
    /// on a fresh read so the caller gets the error for the state that won.
    /// A replay that leaves the winning state as it is (closing a vote that
    /// was just closed) succeeds, as it would have without the race.
    async fn transition<F>(&self, id: Uuid, apply: F) -> Result<Vote, VoteError>
    where
        F: Fn(&mut Vote) -> Result<(), VoteError> + Send + Sync,
    {
        let mut vote = self.load(id).await?;
        let expected = vote.status;
        apply(&mut vote)?;

        match self.store.save_state(&vote, expected).await {
            Ok(()) => Ok(vote),
            Err(StoreError::StaleState) => {
                warn!(vote_id = %id, "Vote state changed during transition");
                let mut current = self.load(id).await?;
                let (status, published_at, closed_at) = (current.status, current.published_at, current.closed_at);
                apply(&mut current)?;
                if (current.status, current.published_at, current.closed_at) == (status, published_at, closed_at) {
                    return Ok(current);
                }
                Err(StoreError::StaleState.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, request), fields(vote_id))]
    pub async fn create_vote(&self, creator: &Identity, request: &CreateVoteRequest) -> Result<VoteView, VoteError> {
        let creator_id = creator.user_id().ok_or(VoteError::Unauthenticated)?;
        let vote = Vote::new_draft(
            creator_id.clone(),
            request,
            self.generate_share_token()?,
            OffsetDateTime::now_utc(),
        );
        tracing::Span::current().record("vote_id", tracing::field::display(vote.id));

        self.store.insert_vote(&vote).await?;
        info!(vote_id = %vote.id, options = vote.options.len(), "Created draft vote");
        self.render(&vote, creator, false).await
    }

    #[instrument(skip(self, request))]
    pub async fn edit_vote(&self, id: Uuid, actor: &Identity, request: &CreateVoteRequest) -> Result<VoteView, VoteError> {
        let mut vote = self.load(id).await?;
        vote.edit(actor, request)?;

        match self.store.replace_draft(&vote).await {
            Ok(()) => {}
            Err(StoreError::StaleState) => {
                // re-run against the state that won to get the right message
                let mut current = self.load(id).await?;
                current.edit(actor, request)?;
                return Err(StoreError::StaleState.into());
            }
            Err(e) => return Err(e.into()),
        }

        debug!(vote_id = %id, "Replaced draft contents");
        self.render(&vote, actor, false).await
    }

    #[instrument(skip(self))]
    pub async fn publish_vote(&self, id: Uuid, actor: &Identity) -> Result<VoteView, VoteError> {
        let vote = self
            .transition(id, |vote| vote.publish(actor, OffsetDateTime::now_utc()))
            .await?;
        info!(vote_id = %id, "Published vote");
        self.render(&vote, actor, false).await
    }

    #[instrument(skip(self))]
    pub async fn close_vote(&self, id: Uuid, actor: &Identity) -> Result<VoteView, VoteError> {
        let vote = self
            .transition(id, |vote| vote.close(actor, OffsetDateTime::now_utc()))
            .await?;
        info!(vote_id = %id, "Closed vote");
        self.render(&vote, actor, false).await
    }

    #[instrument(skip(self))]
    pub async fn delete_vote(&self, id: Uuid, actor: &Identity) -> Result<(), VoteError> {
        self.transition(id, |vote| vote.delete(actor)).await?;
        info!(vote_id = %id, "Deleted vote");
        Ok(())
    }

    /// Takes the raw requested value so that a missing vote or a foreign actor
    /// is reported before an unknown permission.
    #[instrument(skip(self))]
    pub async fn set_permission(&self, id: Uuid, actor: &Identity, requested: &str) -> Result<VoteView, VoteError> {
        let mut vote = self.load(id).await?;
        vote.set_permission(actor, requested)?;

        match self.store.save_permission(&vote).await {
            Ok(()) => {}
            Err(StoreError::StaleState) => {
                let mut current = self.load(id).await?;
                current.set_permission(actor, requested)?;
                return Err(StoreError::StaleState.into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(vote_id = %id, permission = %vote.permission, "Changed vote permission");
        self.render(&vote, actor, false).await
    }

    #[instrument(skip(self))]
    pub async fn get_vote(&self, id: Uuid, viewer: &Identity) -> Result<VoteView, VoteError> {
        if viewer.is_anonymous() {
            return Err(VoteError::Unauthenticated);
        }
        let vote = self.load(id).await?;
        resolve_viewable(&vote, viewer, Entry::Direct)?;
        self.render(&vote, viewer, false).await
    }

    /// Results only. Same visibility as [`Self::get_vote`].
    #[instrument(skip(self))]
    pub async fn get_results(&self, id: Uuid, viewer: &Identity) -> Result<Tally, VoteError> {
        if viewer.is_anonymous() {
            return Err(VoteError::Unauthenticated);
        }
        let vote = self.load(id).await?;
        resolve_viewable(&vote, viewer, Entry::Direct)?;
        Ok(compute_tally(&vote.options))
    }

    #[instrument(skip(self, token))]
    pub async fn get_vote_by_share_token(&self, token: &str, viewer: &Identity) -> Result<VoteView, VoteError> {
        let vote = self
            .store
            .find_by_share_token(token)
            .await?
            .ok_or(VoteError::NotFound)?;

        let is_creator = viewer.user_id().is_some_and(|user| vote.is_creator(user));
        if vote.status != VoteStatus::Published && !is_creator {
            return Err(VoteError::NotPublished);
        }
        resolve_viewable(&vote, viewer, Entry::ShareLink(Some(token)))?;
        self.render(&vote, viewer, true).await
    }

    /// Votes the viewer may see, optionally narrowed to one status.
    #[instrument(skip(self))]
    pub async fn browse_votes(&self, status: Option<VoteStatus>, viewer: &Identity) -> Result<Vec<VoteView>, VoteError> {
        if viewer.is_anonymous() {
            return Err(VoteError::Unauthenticated);
        }
        let votes = self.store.list_votes(status).await?;

        let mut views = Vec::with_capacity(votes.len());
        for vote in votes.iter().filter(|vote| shared::can_view(vote, viewer, Entry::Direct)) {
            views.push(self.render(vote, viewer, false).await?);
        }
        debug!(visible = views.len(), total = votes.len(), "Browsed votes");
        Ok(views)
    }

    /// Authenticated participation.
    #[instrument(skip(self))]
    pub async fn participate(&self, id: Uuid, option_id: Uuid, viewer: &Identity) -> Result<VoteView, VoteError> {
        let user = viewer.user_id().ok_or(VoteError::Unauthenticated)?;
        let vote = self.load(id).await?;
        check_ballot(&vote, option_id, Entry::Direct)?;

        if self.store.has_voted(id, user).await? {
            return Err(VoteError::AlreadyVoted);
        }
        self.cast(id, option_id, viewer, false).await
    }

    /// Share-link participation. Anonymous callers are let through when configured.
    #[instrument(skip(self, token))]
    pub async fn participate_by_share(
        &self,
        id: Uuid,
        option_id: Uuid,
        token: Option<&str>,
        viewer: &Identity,
    ) -> Result<VoteView, VoteError> {
        let vote = self.load(id).await?;
        check_share_token(&vote, Entry::ShareLink(token))?;
        if viewer.is_anonymous() && !self.allow_anonymous_share {
            return Err(VoteError::Unauthenticated);
        }
        check_open_for_ballot(&vote, option_id)?;

        if let Some(user) = viewer.user_id() {
            if self.store.has_voted(id, user).await? {
                return Err(VoteError::AlreadyVoted);
            }
        }
        let reached_by_token = token.is_some_and(|t| t == vote.share_token);
        self.cast(id, option_id, viewer, reached_by_token).await
    }

    /// Writes the ballot. The store's uniqueness check is authoritative; the
    /// callers' `has_voted` look-ups only spare a transaction.
    async fn cast(&self, id: Uuid, option_id: Uuid, viewer: &Identity, reached_by_token: bool) -> Result<VoteView, VoteError> {
        let ballot = VoteResponse::new(id, viewer.user_id().cloned(), option_id, OffsetDateTime::now_utc());

        match self.store.record_ballot(&ballot).await {
            Ok(()) => {}
            Err(StoreError::DuplicateBallot) => {
                debug!(vote_id = %id, "Concurrent duplicate ballot rejected by store");
                return Err(VoteError::AlreadyVoted);
            }
            Err(e) => return Err(e.into()),
        }
        debug!(vote_id = %id, option_id = %option_id, anonymous = viewer.is_anonymous(), "Ballot recorded");

        let vote = self.load(id).await?;
        self.render(&vote, viewer, reached_by_token).await
    }
}
