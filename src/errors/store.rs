use thiserror::Error;
use redis::RedisError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // A unique index rejected the write, e.g. a second user with the same email.
    #[error("Duplicate value for unique field '{0}'")]
    Duplicate(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;
