use thiserror::Error;

use super::validation::FieldErrors;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("bad request: {0}")]
    InvalidRequest(String),
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("authentication credentials were not provided")]
    NotAuthenticated,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("permission denied")]
    Forbidden,
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::NotAuthenticated => 1004,
            AuthError::AuthenticationFailed(_) => 1005,
            AuthError::InvalidToken(_) => 1006,
            AuthError::Forbidden => 1007,
            AuthError::InvalidRequest(_) => 1008,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Repository(_) => 1200,
        }
    }

    /// Errors caused by the server rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Repository(_))
    }
}

impl From<models::errors::ModelError> for AuthError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Conflict(_) => AuthError::Conflict,
            other => AuthError::Repository(other.to_string()),
        }
    }
}
