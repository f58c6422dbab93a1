use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("row not found")]
    NotFound,
}
