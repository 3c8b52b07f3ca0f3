use serde::{Serialize, Deserialize};
use time::OffsetDateTime;
use uuid::Uuid;
use crate::identity::Identity;
use crate::models::{UserId, Vote, VotePermission, VoteStatus};
use crate::tally::compute_tally;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
    pub vote_count: u64,
    pub percentage: f64,
}

/// What a viewer sees of a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_id: UserId,
    pub options: Vec<OptionView>,
    pub status: VoteStatus,
    pub permission: VotePermission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    pub created_at: OffsetDateTime,
    pub published_at: Option<OffsetDateTime>,
    pub closed_at: Option<OffsetDateTime>,
    pub has_voted: bool,
    pub total_votes: u64,
}

impl VoteView {
    /// `has_voted` must come from the ballot store; it is forced to `false`
    /// for anonymous viewers. The share token is shown to the creator, or when
    /// the caller reached the vote through the token itself.
    pub fn render(vote: &Vote, viewer: &Identity, has_voted: bool, reached_by_token: bool) -> Self {
        let tally = compute_tally(&vote.options);
        let is_creator = viewer.user_id().is_some_and(|user| vote.is_creator(user));

        let options = vote
            .options
            .iter()
            .zip(&tally.options)
            .map(|(option, counted)| OptionView {
                id: option.id,
                text: option.text.clone(),
                vote_count: counted.count,
                percentage: counted.percentage,
            })
            .collect();

        VoteView {
            id: vote.id,
            title: vote.title.clone(),
            description: vote.description.clone(),
            creator_id: vote.creator_id.clone(),
            options,
            status: vote.status,
            permission: vote.permission,
            share_token: (is_creator || reached_by_token).then(|| vote.share_token.clone()),
            created_at: vote.created_at,
            published_at: vote.published_at,
            closed_at: vote.closed_at,
            has_voted: has_voted && !viewer.is_anonymous(),
            total_votes: tally.total_votes,
        }
    }
}
