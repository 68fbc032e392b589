use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Generic message returned for every server-side failure. Store and
/// hashing details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong, try again later";

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Account and session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    BadRequest,

    // Accounts (E1xxx)
    InvalidCredentials,
    AccountAlreadyExists,
    UserNotFound,
    TokenExpired,
    TokenInvalid,
    SessionExpired,
    RefreshTokenMissing,
    RefreshTokenNotFound,
    PasswordTooWeak,
    PasswordMismatch,
    ResetTokenInvalid,
    VerificationTokenInvalid,
    EmailAlreadyVerified,
    InvalidEmail,
    UsernameIsEmail,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::BadRequest => "E0008",

            // Accounts
            Self::InvalidCredentials => "E1001",
            Self::AccountAlreadyExists => "E1002",
            Self::UserNotFound => "E1003",
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",
            Self::SessionExpired => "E1006",
            Self::RefreshTokenMissing => "E1007",
            Self::RefreshTokenNotFound => "E1008",
            Self::PasswordTooWeak => "E1009",
            Self::PasswordMismatch => "E1010",
            Self::ResetTokenInvalid => "E1011",
            Self::VerificationTokenInvalid => "E1012",
            Self::EmailAlreadyVerified => "E1013",
            Self::InvalidEmail => "E1014",
            Self::UsernameIsEmail => "E1015",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::ValidationError | Self::BadRequest | Self::InvalidCredentials
            | Self::AccountAlreadyExists | Self::SessionExpired | Self::RefreshTokenMissing
            | Self::RefreshTokenNotFound | Self::PasswordTooWeak | Self::PasswordMismatch
            | Self::ResetTokenInvalid | Self::VerificationTokenInvalid
            | Self::EmailAlreadyVerified | Self::InvalidEmail | Self::UsernameIsEmail => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
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

    /// The message is logged, never sent to the client.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code: ErrorCode::InternalError, message } => {
                tracing::error!(error = %message, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), INTERNAL_ERROR_MESSAGE),
                )
            }
            AppError::Known { code, message } => (code.status_code(), ApiErrorResponse::new(code.code(), message)),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), INTERNAL_ERROR_MESSAGE),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new(ErrorCode::ValidationError.code(), msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn known_error_renders_code_and_message() {
        let resp = AppError::new(ErrorCode::SessionExpired, "Token expired, get a new one at /login").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = body_json(resp).await;
        assert_eq!(body["error"], "Token expired, get a new one at /login");
        assert_eq!(body["code"], "E1006");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let resp = AppError::internal("connection refused (os error 111)").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(resp).await;
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn anyhow_error_is_generic_500() {
        let resp = AppError::from(anyhow::anyhow!("pool timed out")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn validation_error_is_400() {
        let resp = AppError::Validation("Username is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["code"], "E0002");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ErrorCode::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::TokenInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::AccountAlreadyExists.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RefreshTokenNotFound.status_code(), StatusCode::BAD_REQUEST);
    }
}
