//! Vote state machine and read-path visibility.
//!
//! ```text
//! Draft ──publish──▶ Published ──close──▶ Closed
//!   │                    │                  │
//!   └──────close─────────┼──────────────────┤
//!   └──────────────────delete───────────────┴──▶ Deleted
//! ```
//!
//! Deleted is absorbing. Every transition first resolves the actor to the
//! creator, then checks the current state.

use time::OffsetDateTime;
use crate::error::VoteError;
use crate::identity::Identity;
use crate::models::{CreateVoteRequest, UserId, Vote, VoteOption, VotePermission, VoteStatus};
use crate::validation::MIN_OPTIONS;

/// How a caller reached a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'a> {
    /// Identity-authenticated get, browse and participate.
    Direct,
    /// Share-link path, with whatever token the caller presented.
    ShareLink(Option<&'a str>),
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Edit,
    Publish,
    Close,
    Delete,
    ChangePermission,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::Publish => "publish",
            Action::Close => "close",
            Action::Delete => "delete",
            Action::ChangePermission => "modify",
        }
    }
}

impl Vote {
    fn require_creator<'a>(&self, actor: &'a Identity, action: Action) -> Result<&'a UserId, VoteError> {
        let user = actor.user_id().ok_or(VoteError::Unauthenticated)?;
        if !self.is_creator(user) {
            return Err(VoteError::forbidden(format!("You can only {} your own votes", action.verb())));
        }
        Ok(user)
    }

    /// Replaces title, description and the whole option set. Draft only.
    ///
    /// A `None` permission keeps the current one; unknown strings fall back to Public.
    pub fn edit(&mut self, actor: &Identity, request: &CreateVoteRequest) -> Result<(), VoteError> {
        self.require_creator(actor, Action::Edit)?;
        match self.status {
            VoteStatus::Draft => {}
            VoteStatus::Published => return Err(VoteError::invalid_transition("Cannot edit published vote")),
            VoteStatus::Closed => return Err(VoteError::invalid_transition("Cannot edit closed vote")),
            VoteStatus::Deleted => return Err(VoteError::invalid_transition("Cannot edit deleted vote")),
        }

        self.title = request.title.clone();
        self.description = request.description.clone();
        if let Some(permission) = request.permission.as_deref() {
            self.permission = VotePermission::parse_or_public(permission);
        }
        let vote_id = self.id;
        self.options = request
            .options
            .iter()
            .map(|text| VoteOption::new(vote_id, text.as_str()))
            .collect();
        Ok(())
    }

    pub fn publish(&mut self, actor: &Identity, now: OffsetDateTime) -> Result<(), VoteError> {
        self.require_creator(actor, Action::Publish)?;
        match self.status {
            VoteStatus::Draft => {}
            VoteStatus::Published => return Err(VoteError::invalid_transition("Vote is already published")),
            VoteStatus::Closed => return Err(VoteError::invalid_transition("Cannot publish closed vote")),
            VoteStatus::Deleted => return Err(VoteError::invalid_transition("Cannot publish deleted vote")),
        }
        if self.options.len() < MIN_OPTIONS {
            return Err(VoteError::InsufficientOptions);
        }

        self.status = VoteStatus::Published;
        self.published_at = Some(now);
        Ok(())
    }

    /// Closing an already closed vote keeps the original `closed_at`.
    pub fn close(&mut self, actor: &Identity, now: OffsetDateTime) -> Result<(), VoteError> {
        self.require_creator(actor, Action::Close)?;
        match self.status {
            VoteStatus::Deleted => Err(VoteError::invalid_transition("Cannot close deleted vote")),
            VoteStatus::Closed => Ok(()),
            VoteStatus::Draft | VoteStatus::Published => {
                self.status = VoteStatus::Closed;
                self.closed_at = Some(now);
                Ok(())
            }
        }
    }

    /// Soft delete. The record stays, but only the creator can see it.
    pub fn delete(&mut self, actor: &Identity) -> Result<(), VoteError> {
        self.require_creator(actor, Action::Delete)?;
        if self.status == VoteStatus::Deleted {
            return Err(VoteError::invalid_transition("Vote is already deleted"));
        }
        self.status = VoteStatus::Deleted;
        self.closed_at = None;
        Ok(())
    }

    /// The requested value is parsed strictly, and only once the actor and
    /// state checks have passed.
    pub fn set_permission(&mut self, actor: &Identity, requested: &str) -> Result<(), VoteError> {
        self.require_creator(actor, Action::ChangePermission)?;
        if self.status == VoteStatus::Deleted {
            return Err(VoteError::invalid_transition("Cannot change permission of deleted vote"));
        }
        self.permission = requested.parse::<VotePermission>()?;
        Ok(())
    }

    /// Timestamp invariants: `closed_at` iff Closed, `published_at` never on a Draft.
    pub fn timestamps_consistent(&self) -> bool {
        let closed = self.closed_at.is_some() == (self.status == VoteStatus::Closed);
        let published = self.published_at.is_none() || self.status != VoteStatus::Draft;
        closed && published
    }
}

/// Whether `viewer` may see `vote` when arriving through `entry`.
///
/// LinkOnly is only checked against the token on the share-link path. On the
/// direct path it behaves like Public for every authenticated identity.
pub fn can_view(vote: &Vote, viewer: &Identity, entry: Entry<'_>) -> bool {
    if viewer.user_id().is_some_and(|user| vote.is_creator(user)) {
        return true;
    }
    if vote.status != VoteStatus::Published {
        return false;
    }
    match vote.permission {
        VotePermission::Public => true,
        VotePermission::Private => false,
        VotePermission::LinkOnly => match entry {
            Entry::Direct => true,
            Entry::ShareLink(token) => token == Some(vote.share_token.as_str()),
        },
    }
}

pub fn resolve_viewable(vote: &Vote, viewer: &Identity, entry: Entry<'_>) -> Result<(), VoteError> {
    if can_view(vote, viewer, entry) {
        Ok(())
    } else {
        Err(VoteError::forbidden("You do not have access to this vote"))
    }
}
