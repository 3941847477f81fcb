//! Server errors and their translation into client responses.
//!
//! [`translate`] maps every [`AppError`] to exactly one [`StableCode`] and one [`RpcStatus`]. Clients receive
//!
//! ```json
//! {"error": {"code": "USER_ALREADY_EXISTS", "message": "A user with this username already exists"}}
//! ```
//!
//! with the HTTP status derived from the RPC status and a `grpc-status` header carrying the numeric RPC code. Internal
//! error details are logged and never sent.
use std::fmt::Display;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::*;
use marketplace_engine::{AppError, ErrorKind, INTERNAL_CLIENT_MESSAGE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GRPC_STATUS_HEADER: &str = "grpc-status";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error(transparent)]
    App(#[from] AppError),
}

/// Client-facing error identifiers. These strings are part of the public contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StableCode {
    UserNotFound,
    UserAlreadyExists,
    ListingNotFound,
    InvalidCredentials,
    InvalidToken,
    Unauthorized,
    Forbidden,
    ValidationFailed,
    InternalError,
}

impl StableCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::ListingNotFound => "LISTING_NOT_FOUND",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Display for StableCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The RPC status codes the translator produces, with their gRPC numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcStatus {
    InvalidArgument = 3,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    Internal = 13,
    Unauthenticated = 16,
}

impl RpcStatus {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub code: StableCode,
    pub status: RpcStatus,
}

pub fn translate(err: &AppError) -> Translation {
    let (code, status) = match err {
        AppError::UserNotFound => (StableCode::UserNotFound, RpcStatus::NotFound),
        AppError::ListingNotFound => (StableCode::ListingNotFound, RpcStatus::NotFound),
        AppError::UserAlreadyExists => (StableCode::UserAlreadyExists, RpcStatus::AlreadyExists),
        AppError::InvalidCredentials => (StableCode::InvalidCredentials, RpcStatus::Unauthenticated),
        AppError::InvalidToken => (StableCode::InvalidToken, RpcStatus::Unauthenticated),
        AppError::Unauthorized => (StableCode::Unauthorized, RpcStatus::Unauthenticated),
        AppError::Forbidden(_) => (StableCode::Forbidden, RpcStatus::PermissionDenied),
        AppError::ValidationFailed(_) => (StableCode::ValidationFailed, RpcStatus::InvalidArgument),
        AppError::Internal(_) => (StableCode::InternalError, RpcStatus::Internal),
    };
    Translation { code, status }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: StableCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl ServerError {
    /// The domain error this server error is reported as. Anything that is not already an [`AppError`] is internal.
    pub fn as_app_error(&self) -> AppError {
        match self {
            Self::App(e) => e.clone(),
            e => AppError::internal(e),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        translate(&self.as_app_error()).status.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        let err = self.as_app_error();
        let Translation { code, status } = translate(&err);
        if err.kind() == ErrorKind::Internal {
            error!("💻️ {code}: {err}");
        } else {
            warn!("💻️ {code}: {err}");
        }
        let message = match err.kind() {
            ErrorKind::Internal => INTERNAL_CLIENT_MESSAGE.to_string(),
            _ => err.client_message(),
        };
        let envelope = ErrorEnvelope { error: ErrorBody { code, message } };
        let body = serde_json::to_string(&envelope).unwrap_or_else(|_| {
            format!(r#"{{"error":{{"code":"INTERNAL_ERROR","message":"{INTERNAL_CLIENT_MESSAGE}"}}}}"#)
        });
        HttpResponse::build(status.http_status())
            .insert_header(ContentType::json())
            .insert_header((GRPC_STATUS_HEADER, status.code().to_string()))
            .body(body)
    }
}
