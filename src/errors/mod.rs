use thiserror::Error;

pub mod response;
pub mod store;

pub use store::{StoreError, StoreResult};

#[derive(Error, Debug)]
pub enum AppError {
    // Missing or malformed client input, detected before any write.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    // Unique constraint violation.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Store(StoreError),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn required(field: &str) -> Self {
        AppError::Validation(format!("Field '{}' is required", field))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate("email") => AppError::Conflict("Email must be unique".into()),
            StoreError::Duplicate(field) => {
                AppError::Conflict(format!("Field '{}' must be unique", field))
            }
            other => AppError::Store(other),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
