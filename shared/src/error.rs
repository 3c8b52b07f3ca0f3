use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::validation::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    NotFound,
    Forbidden,
    Unauthenticated,
    InvalidStateTransition,
    InsufficientOptions,
    NotPublished,
    VoteClosed,
    InvalidOption,
    AlreadyVoted,
    ValidationFailed,
    SystemError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}

/// Every way a vote operation can be refused.
///
/// Storage failures arrive as `Internal` and are never retried here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VoteError {
    #[error("Vote not found")]
    NotFound,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidStateTransition(String),
    #[error("Vote must have at least 2 options")]
    InsufficientOptions,
    #[error("Vote is not published")]
    NotPublished,
    #[error("Vote is closed")]
    VoteClosed,
    #[error("Invalid option")]
    InvalidOption,
    #[error("You have already voted")]
    AlreadyVoted,
    #[error("Authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VoteError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidStateTransition(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound => ErrorCode::NotFound,
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::InvalidStateTransition(_) => ErrorCode::InvalidStateTransition,
            Self::InsufficientOptions => ErrorCode::InsufficientOptions,
            Self::NotPublished => ErrorCode::NotPublished,
            Self::VoteClosed => ErrorCode::VoteClosed,
            Self::InvalidOption => ErrorCode::InvalidOption,
            Self::AlreadyVoted => ErrorCode::AlreadyVoted,
            Self::Unauthenticated => ErrorCode::Unauthenticated,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Internal(_) => ErrorCode::SystemError,
        }
    }

    /// Body sent to clients. Internal details stay in the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            Self::Internal(_) => "An internal server error occurred.".to_string(),
            other => other.to_string(),
        };
        ErrorResponse { error, code: self.code() }
    }
}

pub type Result<T> = std::result::Result<T, VoteError>;
