use std::fmt::Display;

use thiserror::Error;

use crate::{db::sqlite::SqliteDatabaseError, TransactionError};

/// The closed set of failures that the engine (and the server pipeline) can report.
///
/// The `Display` text of every variant except [`AppError::Internal`] is safe to show to clients. Internal errors carry
/// a detail string for the server logs only; use [`AppError::client_message`] when building a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("User not found")]
    UserNotFound,
    #[error("Listing not found")]
    ListingNotFound,
    #[error("A user with this username already exists")]
    UserAlreadyExists,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authorization required")]
    Unauthorized,
    #[error("Access denied. {0}")]
    Forbidden(String),
    #[error("Validation failed. {0}")]
    ValidationFailed(String),
    #[error("Internal server error. {0}")]
    Internal(String),
}

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidCredentials,
    InvalidToken,
    Unauthorized,
    Forbidden,
    ValidationFailed,
    Internal,
}

pub const INTERNAL_CLIENT_MESSAGE: &str = "Internal server error";

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound | Self::ListingNotFound => ErrorKind::NotFound,
            Self::UserAlreadyExists => ErrorKind::AlreadyExists,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message that may be sent to a client. Internal details are replaced with a generic message.
    pub fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => INTERNAL_CLIENT_MESSAGE.to_string(),
            e => e.to_string(),
        }
    }

    pub fn internal<D: Display>(detail: D) -> Self {
        Self::Internal(detail.to_string())
    }

    pub fn validation<D: Display>(reason: D) -> Self {
        Self::ValidationFailed(reason.to_string())
    }
}

impl ErrorKind {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

impl From<SqliteDatabaseError> for AppError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateUsername(_) => Self::UserAlreadyExists,
            SqliteDatabaseError::AuthorNotFound(_) => Self::UserNotFound,
            e => Self::Internal(e.to_string()),
        }
    }
}

impl From<TransactionError> for AppError {
    fn from(e: TransactionError) -> Self {
        Self::Internal(e.to_string())
    }
}
