use vq_shared::errors::{AppError, ErrorCode};

use crate::models::TokenPurpose;
use crate::store::StoreError;

/// Failures raised by the account core. Every variant is resolved to a
/// response in one place, `From<AuthError> for AppError`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("username cannot be an email")]
    UsernameIsEmail,

    #[error("weak password: {0}")]
    WeakPassword(&'static str),

    #[error("user not found")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("email or username already exists")]
    Conflict,

    #[error("refresh token missing")]
    TokenMissing,

    #[error("refresh token not found")]
    TokenNotFound,

    #[error("refresh token expired")]
    TokenExpired,

    #[error("refresh token reuse detected")]
    TokenReuseDetected,

    #[error("{0} token invalid or expired")]
    InvalidOrExpiredToken(TokenPurpose),

    #[error("email already verified")]
    EmailAlreadyVerified,

    #[error("new password and confirmation differ")]
    PasswordMismatch,

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => AppError::Validation(msg),
            AuthError::InvalidEmail => AppError::new(ErrorCode::InvalidEmail, "Bad Email"),
            AuthError::UsernameIsEmail => AppError::new(ErrorCode::UsernameIsEmail, "Username cannot be an email"),
            AuthError::WeakPassword(msg) => AppError::new(ErrorCode::PasswordTooWeak, msg),
            AuthError::UserNotFound => AppError::new(ErrorCode::UserNotFound, "Email or username not found"),
            AuthError::WrongPassword => AppError::new(ErrorCode::InvalidCredentials, "Wrong Password"),
            AuthError::Conflict | AuthError::Store(StoreError::Conflict) => {
                AppError::new(ErrorCode::AccountAlreadyExists, "Email or Username already exists")
            }
            AuthError::TokenMissing => AppError::new(ErrorCode::RefreshTokenMissing, "Need refresh token in the header"),
            AuthError::TokenNotFound => AppError::new(ErrorCode::RefreshTokenNotFound, "Token not found"),
            // Reuse and expiry are indistinguishable to the caller.
            AuthError::TokenExpired | AuthError::TokenReuseDetected => {
                AppError::new(ErrorCode::SessionExpired, "Token expired, get a new one at /login")
            }
            AuthError::InvalidOrExpiredToken(TokenPurpose::PasswordReset) => AppError::new(
                ErrorCode::ResetTokenInvalid,
                "Password reset token invalid or expired, get a new one at /changepassword",
            ),
            AuthError::InvalidOrExpiredToken(TokenPurpose::EmailVerification) => AppError::new(
                ErrorCode::VerificationTokenInvalid,
                "Verification token invalid or expired, get a new one at /sendemailverificationemail",
            ),
            AuthError::EmailAlreadyVerified => AppError::new(ErrorCode::EmailAlreadyVerified, "Email already verified"),
            AuthError::PasswordMismatch => AppError::new(
                ErrorCode::PasswordMismatch,
                "New password and confirm password did not match",
            ),
            AuthError::Store(StoreError::NotFound) => AppError::not_found("resource not found"),
            err @ (AuthError::Crypto(_) | AuthError::Store(StoreError::Backend(_))) => {
                AppError::internal(err.to_string())
            }
        }
    }
}
