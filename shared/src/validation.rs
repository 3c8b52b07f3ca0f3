use std::collections::HashSet;
use serde::{Serialize, Deserialize};
use crate::models::CreateVoteRequest;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_OPTION_LENGTH: usize = 200;
pub const MAX_OPTIONS: usize = 20;
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,
    #[error("Title must not exceed {MAX_TITLE_LENGTH} characters")]
    TitleTooLong,
    #[error("Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH}")]
    DescriptionTooLong,
    #[error("Too many options (maximum {MAX_OPTIONS})")]
    TooManyOptions,
    #[error("At least {MIN_OPTIONS} options are required")]
    TooFewOptions,
    #[error("Option text exceeds maximum length of {MAX_OPTION_LENGTH}")]
    OptionTooLong,
    #[error("Duplicate option: {0}")]
    DuplicateOption(String),
    #[error("Empty option text")]
    EmptyOption,
    #[error("Invalid permission type: {0}")]
    UnknownPermission(String),
}

pub fn validate_vote_request(request: &CreateVoteRequest) -> Result<(), ValidationError> {
    if request.title.trim().is_empty() { return Err(ValidationError::EmptyTitle); }
    if request.title.chars().count() > MAX_TITLE_LENGTH { return Err(ValidationError::TitleTooLong); }
    if request.description.chars().count() > MAX_DESCRIPTION_LENGTH { return Err(ValidationError::DescriptionTooLong); }
    if request.options.len() > MAX_OPTIONS { return Err(ValidationError::TooManyOptions); }
    if request.options.len() < MIN_OPTIONS { return Err(ValidationError::TooFewOptions); }

    if request.options.iter().any(|opt| opt.trim().is_empty()) { return Err(ValidationError::EmptyOption); }
    if request.options.iter().any(|opt| opt.chars().count() > MAX_OPTION_LENGTH) { return Err(ValidationError::OptionTooLong); }

    let mut seen = HashSet::with_capacity(request.options.len());
    if let Some(duplicate) = request.options.iter().find(|opt| !seen.insert(opt.trim().to_lowercase())) {
        return Err(ValidationError::DuplicateOption(duplicate.clone()));
    }

    Ok(())
}
