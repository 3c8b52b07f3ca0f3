use rocket::{State, get, post, put, delete, http::Status, serde::json::Json, FromForm};
use tracing::instrument;
use shared::{validate_vote_request, CreateVoteRequest, Identity, Tally, VoteStatus, VoteView};
use crate::{
    error::ApiError,
    processor::VoteProcessor,
    utils::{parse_option_id, parse_vote_id},
};

pub struct AppState {
    pub processor: VoteProcessor,
}

impl AppState {
    pub fn new(processor: VoteProcessor) -> Self {
        Self { processor }
    }
}

#[derive(Debug, FromForm)]
pub struct BallotQuery<'r> {
    #[field(name = "optionId")]
    option_id: &'r str,
    token: Option<&'r str>,
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[instrument(skip(state, request))]
#[post("/votes", format = "json", data = "<request>")]
pub async fn create_vote(
    state: &State<AppState>,
    identity: Identity,
    request: Json<CreateVoteRequest>,
) -> Result<Json<VoteView>, ApiError> {
    let request = request.into_inner();
    validate_vote_request(&request)?;
    Ok(Json(state.processor.create_vote(&identity, &request).await?))
}

#[instrument(skip(state))]
#[get("/votes?<status>")]
pub async fn browse_votes(
    state: &State<AppState>,
    identity: Identity,
    status: Option<&str>,
) -> Result<Json<Vec<VoteView>>, ApiError> {
    let filter = VoteStatus::parse_filter(status);
    Ok(Json(state.processor.browse_votes(filter, &identity).await?))
}

#[instrument(skip(state))]
#[get("/votes/<id>")]
pub async fn get_vote(state: &State<AppState>, identity: Identity, id: &str) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    Ok(Json(state.processor.get_vote(id, &identity).await?))
}

#[instrument(skip(state, request))]
#[put("/votes/<id>", format = "json", data = "<request>")]
pub async fn edit_vote(
    state: &State<AppState>,
    identity: Identity,
    id: &str,
    request: Json<CreateVoteRequest>,
) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    let request = request.into_inner();
    validate_vote_request(&request)?;
    Ok(Json(state.processor.edit_vote(id, &identity, &request).await?))
}

#[instrument(skip(state))]
#[delete("/votes/<id>")]
pub async fn delete_vote(state: &State<AppState>, identity: Identity, id: &str) -> Result<Status, ApiError> {
    let id = parse_vote_id(id)?;
    state.processor.delete_vote(id, &identity).await?;
    Ok(Status::Ok)
}

#[instrument(skip(state))]
#[post("/votes/<id>/publish")]
pub async fn publish_vote(state: &State<AppState>, identity: Identity, id: &str) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    Ok(Json(state.processor.publish_vote(id, &identity).await?))
}

#[instrument(skip(state))]
#[post("/votes/<id>/close")]
pub async fn close_vote(state: &State<AppState>, identity: Identity, id: &str) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    Ok(Json(state.processor.close_vote(id, &identity).await?))
}

/// Unlike create and edit, an unknown permission here is rejected, after the
/// vote and the caller have been checked.
#[instrument(skip(state))]
#[put("/votes/<id>/permission?<permission>")]
pub async fn set_permission(
    state: &State<AppState>,
    identity: Identity,
    id: &str,
    permission: &str,
) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    Ok(Json(state.processor.set_permission(id, &identity, permission).await?))
}

#[instrument(skip(state), fields(vote_id = %id))]
#[post("/votes/<id>/participate?<ballot..>")]
pub async fn participate(
    state: &State<AppState>,
    identity: Identity,
    id: &str,
    ballot: BallotQuery<'_>,
) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    let option_id = parse_option_id(ballot.option_id)?;
    Ok(Json(state.processor.participate(id, option_id, &identity).await?))
}

#[instrument(skip(state, ballot), fields(vote_id = %id))]
#[post("/votes/<id>/participate-share?<ballot..>")]
pub async fn participate_by_share(
    state: &State<AppState>,
    identity: Identity,
    id: &str,
    ballot: BallotQuery<'_>,
) -> Result<Json<VoteView>, ApiError> {
    let id = parse_vote_id(id)?;
    let option_id = parse_option_id(ballot.option_id)?;
    Ok(Json(
        state
            .processor
            .participate_by_share(id, option_id, ballot.token, &identity)
            .await?,
    ))
}

#[instrument(skip(state, token))]
#[get("/votes/share/<token>")]
pub async fn get_vote_by_share_token(
    state: &State<AppState>,
    identity: Identity,
    token: &str,
) -> Result<Json<VoteView>, ApiError> {
    Ok(Json(state.processor.get_vote_by_share_token(token, &identity).await?))
}

// ranked below /votes/share/<token>, which has the same shape
#[instrument(skip(state))]
#[get("/votes/<id>/results", rank = 2)]
pub async fn get_results(state: &State<AppState>, identity: Identity, id: &str) -> Result<Json<Tally>, ApiError> {
    let id = parse_vote_id(id)?;
    Ok(Json(state.processor.get_results(id, &identity).await?))
}
