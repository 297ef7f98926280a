use async_graphql::ErrorExtensions;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Failure kinds surfaced by resolvers.
///
/// The wire format stays a plain GraphQL error with a message, but every kind carries a stable
/// `code` extension so callers and tests can tell them apart.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Adviser not found")]
    AdviserNotFound,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("{0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::AdviserNotFound => "ADVISER_NOT_FOUND",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::Validation(_) => "BAD_USER_INPUT",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Store(_) => "STORE_ERROR",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Store(e) => {
                error!(error = %e, "store operation failed");
                "Storage error".to_string()
            }
            ApiError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => ApiError::Conflict(format!("{what} already exists")),
            other => ApiError::Store(other),
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code();
        async_graphql::Error::new(self.public_message()).extend_with(|_, e| e.set("code", code))
    }
}
