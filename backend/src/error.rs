use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorCode, ValidationError, VoteError};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid vote ID")]
    InvalidId,
    #[error(transparent)]
    Vote(#[from] VoteError),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Vote(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        let ApiError::Vote(e) = self else { return Status::BadRequest };
        match e.code() {
            ErrorCode::NotFound => Status::NotFound,
            ErrorCode::Forbidden => Status::Forbidden,
            ErrorCode::Unauthenticated => Status::Unauthorized,
            ErrorCode::AlreadyVoted => Status::Conflict,
            ErrorCode::InvalidStateTransition
            | ErrorCode::InsufficientOptions
            | ErrorCode::NotPublished
            | ErrorCode::VoteClosed
            | ErrorCode::InvalidOption
            | ErrorCode::ValidationFailed => Status::BadRequest,
            ErrorCode::SystemError => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let body = match &self {
            ApiError::Vote(e) => {
                if let VoteError::Internal(detail) = e {
                    error!("Internal error on {} {}: {}", req.method(), req.uri(), detail);
                }
                e.to_response()
            }
            ApiError::InvalidId => shared::ErrorResponse {
                error: self.to_string(),
                code: ErrorCode::ValidationFailed,
            },
        };

        rocket::Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}
