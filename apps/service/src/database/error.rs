use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("stored record is malformed: {0}")]
    Corrupt(String),

    #[error("record not found")]
    NotFound,
}

impl From<deadpool::managed::PoolError<libsql::Error>> for StoreError {
    fn from(error: deadpool::managed::PoolError<libsql::Error>) -> Self {
        match error {
            deadpool::managed::PoolError::Backend(e) => StoreError::Query(e),
            other => StoreError::Pool(other.to_string()),
        }
    }
}
