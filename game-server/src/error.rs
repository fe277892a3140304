use warp::http::StatusCode;

use game_core::{ConfigError, ValidationError};
use game_persistence::StorageError;
use game_types::{ErrorKind, ErrorResponse};

use crate::session::SessionError;

const INTERNAL_MESSAGE: &str = "Something went wrong, please try again";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("missing or mismatched CSRF token, reload the page and try again")]
    Csrf,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Config(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(ValidationError::GameOver)
            | ApiError::Validation(ValidationError::GameNotWon) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Csrf => StatusCode::FORBIDDEN,
            ApiError::Storage(_) | ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Config(_) => ErrorKind::InvalidRange,
            ApiError::Validation(ValidationError::GameOver) => ErrorKind::GameOver,
            ApiError::Validation(ValidationError::GameNotWon) => ErrorKind::NoWinningGame,
            ApiError::Validation(_) => ErrorKind::InvalidInput,
            ApiError::Csrf => ErrorKind::CsrfRejected,
            ApiError::Storage(_) | ApiError::Session(_) => ErrorKind::Internal,
        }
    }

    /// Body sent to the client. Internal failures are reported generically.
    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ApiError::Storage(_) | ApiError::Session(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        };

        ErrorResponse {
            kind: self.kind(),
            error,
        }
    }
}
