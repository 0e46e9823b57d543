use thiserror::Error;

/// Errors from service-level plumbing outside the auth workflows.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}
