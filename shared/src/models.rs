use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "vote_status", rename_all = "lowercase"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteStatus {
    Draft,
    Published,
    Closed,
    Deleted,
}

impl VoteStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            VoteStatus::Draft => "draft",
            VoteStatus::Published => "published",
            VoteStatus::Closed => "closed",
            VoteStatus::Deleted => "deleted",
        }
    }

    /// Status filter for listings. Anything unrecognised means "no filter".
    pub fn parse_filter(value: Option<&str>) -> Option<Self> {
        let value = value?.trim();
        [Self::Draft, Self::Published, Self::Closed, Self::Deleted]
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "vote_permission", rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotePermission {
    #[default]
    Public,
    Private,
    LinkOnly,
}

impl VotePermission {
    pub const fn as_str(self) -> &'static str {
        match self {
            VotePermission::Public => "public",
            VotePermission::Private => "private",
            VotePermission::LinkOnly => "link_only",
        }
    }

    /// Lenient parse used by create and edit: unknown values become `Public`.
    pub fn parse_or_public(value: &str) -> Self {
        value.parse().unwrap_or(VotePermission::Public)
    }
}

impl FromStr for VotePermission {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        [Self::Public, Self::Private, Self::LinkOnly]
            .into_iter()
            .find(|permission| permission.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| ValidationError::UnknownPermission(value.to_string()))
    }
}

impl fmt::Display for VotePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verified user id handed over by the identity provider. Opaque to this service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOption {
    pub id: Uuid,
    pub vote_id: Uuid,
    pub text: String,
    pub vote_count: u64,
}

impl VoteOption {
    pub fn new(vote_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vote_id,
            text: text.into(),
            vote_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: UserId,
    pub options: Vec<VoteOption>,
    pub status: VoteStatus,
    pub permission: VotePermission,
    pub share_token: String,
    pub created_at: OffsetDateTime,
    pub published_at: Option<OffsetDateTime>,
    pub closed_at: Option<OffsetDateTime>,
}

impl Vote {
    /// Builds a Draft owned by `creator`. The share token is fixed for the vote's lifetime.
    pub fn new_draft(
        creator: UserId,
        request: &CreateVoteRequest,
        share_token: String,
        now: OffsetDateTime,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            creator_id: creator,
            options: request.options.iter().map(|text| VoteOption::new(id, text.as_str())).collect(),
            status: VoteStatus::Draft,
            permission: request.permission(),
            share_token,
            created_at: now,
            published_at: None,
            closed_at: None,
        }
    }

    pub fn is_creator(&self, user: &UserId) -> bool {
        &self.creator_id == user
    }

    pub fn option(&self, option_id: Uuid) -> Option<&VoteOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.vote_count).sum()
    }
}

/// A single ballot. `user_id` is `None` for anonymous share-link participation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: Uuid,
    pub vote_id: Uuid,
    pub user_id: Option<UserId>,
    pub option_id: Uuid,
    pub cast_at: OffsetDateTime,
}

impl VoteResponse {
    pub fn new(vote_id: Uuid, user_id: Option<UserId>, option_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            vote_id,
            user_id,
            option_id,
            cast_at: now,
        }
    }
}

/// Body of create and edit requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVoteRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub permission: Option<String>,
}

impl CreateVoteRequest {
    pub fn permission(&self) -> VotePermission {
        self.permission
            .as_deref()
            .map(VotePermission::parse_or_public)
            .unwrap_or_default()
    }
}
