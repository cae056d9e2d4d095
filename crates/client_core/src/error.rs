use shared::{
    domain::PersonId,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("server returned {status}: {}", .error.message)]
    Status { status: u16, error: ApiError },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiClientError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            error: ApiError::new(ErrorCode::from_status(status), message),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiClientError::Status { error, .. } => error.code,
            ApiClientError::Transport(_)
            | ApiClientError::Decode(_)
            | ApiClientError::InvalidUrl(_) => ErrorCode::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("person {0} is not in the loaded records")]
    UnknownPerson(PersonId),
    #[error("person {0} has no pending changes")]
    NoChanges(PersonId),
    #[error("person {0} is already being updated")]
    Busy(PersonId),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Remote(#[from] ApiClientError),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
