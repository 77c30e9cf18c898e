use std::fmt;

/// Error taxonomy for every service and store operation.
///
/// Domain variants carry the human-readable message that ends up in the
/// uniform outcome handed to the UI, so `Display` prints them bare.
/// Infrastructure variants keep a category prefix for logs.
#[derive(Debug)]
pub enum AppError {
    NotAuthenticated(String),
    InvalidArgument(String),
    DuplicateState(String),
    NotFound(String),
    StoreFailure(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotAuthenticated(msg) => write!(f, "{}", msg),
            AppError::InvalidArgument(msg) => write!(f, "{}", msg),
            AppError::DuplicateState(msg) => write!(f, "{}", msg),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::StoreFailure(msg) => write!(f, "Store failure: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StoreFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("document (de)serialization failed: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
