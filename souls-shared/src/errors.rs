use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Social (posts/memories) errors
/// - E3xxx: Tunnel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    UsernameTaken,
    PasswordMismatch,
    PasswordTooWeak,
    TokenExpired,
    TokenInvalid,
    ProfileNotFound,

    // Social (E2xxx)
    PostNotFound,
    EmptyComment,
    MemoryFieldsMissing,

    // Tunnel (E3xxx)
    TunnelNotFound,
    NotTunnelParty,
    CannotTunnelSelf,
    RecipientNotFound,
    OtpInvalid,
    OtpExpired,
    TunnelInactive,
    TunnelExpired,
    InvalidProfileCode,
    ProfileCodeRequired,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0006",
            Self::BadRequest => "E0007",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::UsernameTaken => "E1003",
            Self::PasswordMismatch => "E1004",
            Self::PasswordTooWeak => "E1005",
            Self::TokenExpired => "E1006",
            Self::TokenInvalid => "E1007",
            Self::ProfileNotFound => "E1008",

            // Social
            Self::PostNotFound => "E2001",
            Self::EmptyComment => "E2002",
            Self::MemoryFieldsMissing => "E2003",

            // Tunnel
            Self::TunnelNotFound => "E3001",
            Self::NotTunnelParty => "E3002",
            Self::CannotTunnelSelf => "E3003",
            Self::RecipientNotFound => "E3004",
            Self::OtpInvalid => "E3005",
            Self::OtpExpired => "E3006",
            Self::TunnelInactive => "E3007",
            Self::TunnelExpired => "E3008",
            Self::InvalidProfileCode => "E3009",
            Self::ProfileCodeRequired => "E3010",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordMismatch
            | Self::PasswordTooWeak | Self::EmptyComment | Self::MemoryFieldsMissing
            | Self::ProfileCodeRequired => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::PostNotFound
            | Self::TunnelNotFound | Self::RecipientNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid | Self::OtpInvalid | Self::OtpExpired
            | Self::InvalidProfileCode => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotTunnelParty | Self::CannotTunnelSelf => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::UsernameTaken => StatusCode::CONFLICT,
            Self::TunnelInactive | Self::TunnelExpired => StatusCode::GONE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::ServiceUnavailable,
            ErrorCode::BadRequest,
            ErrorCode::InvalidCredentials,
            ErrorCode::EmailAlreadyExists,
            ErrorCode::UsernameTaken,
            ErrorCode::PasswordMismatch,
            ErrorCode::PasswordTooWeak,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::ProfileNotFound,
            ErrorCode::PostNotFound,
            ErrorCode::EmptyComment,
            ErrorCode::MemoryFieldsMissing,
            ErrorCode::TunnelNotFound,
            ErrorCode::NotTunnelParty,
            ErrorCode::CannotTunnelSelf,
            ErrorCode::RecipientNotFound,
            ErrorCode::OtpInvalid,
            ErrorCode::OtpExpired,
            ErrorCode::TunnelInactive,
            ErrorCode::TunnelExpired,
            ErrorCode::InvalidProfileCode,
            ErrorCode::ProfileCodeRequired,
        ];
        let mut codes: Vec<&str> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn otp_failures_map_to_unauthorized() {
        assert_eq!(ErrorCode::OtpInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::OtpExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InvalidProfileCode.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn duplicate_signup_maps_to_conflict() {
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::UsernameTaken.status_code(), StatusCode::CONFLICT);
    }
}
