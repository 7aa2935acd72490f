use thiserror::Error;

use crate::domain::CredentialError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown username and wrong password are deliberately the same error.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid username: {0}")]
    InvalidUsername(CredentialError),

    #[error("Weak password: {0}")]
    WeakPassword(CredentialError),

    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Admin accounts cannot be deleted: {0}")]
    ForbiddenDelete(String),

    #[error("Daily limit reached for {username}: {used_today} of {daily_limit} used")]
    QuotaExceeded {
        username: String,
        daily_limit: u32,
        used_today: u32,
    },

    #[error("Invalid daily limit: {0} (must be between 0 and {max})", max = u32::MAX)]
    InvalidLimit(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification used by request layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    NotFound,
    Conflict,
    Forbidden,
    QuotaExceeded,
    Storage,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidUsername(_) | AppError::WeakPassword(_) | AppError::InvalidLimit(_) => {
                ErrorKind::Validation
            }
            AppError::InvalidCredentials => ErrorKind::Unauthorized,
            AppError::AccountNotFound(_) => ErrorKind::NotFound,
            AppError::UsernameTaken(_) => ErrorKind::Conflict,
            AppError::ForbiddenDelete(_) => ErrorKind::Forbidden,
            AppError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            AppError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// HTTP status class for this error.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::QuotaExceeded => 429,
            ErrorKind::Storage => 500,
        }
    }
}
