use domain::order::ValidationError;
use persistence::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to encode event payload: {0}")]
    Serialization(#[from] serde_json::Error),
}
