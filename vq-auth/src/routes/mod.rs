pub mod change_password;
pub mod forgot_password;
pub mod health;
pub mod login;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod register;
pub mod reset_password;
pub mod verify_email;

use axum::http::HeaderMap;

use vq_shared::errors::{AppError, AppResult};

use crate::error::AuthResult;

/// Header that carries the refresh token on `/refreshtoken` and `/logout`.
pub const REFRESH_HEADER: &str = "Refresh";

/// Runs a synchronous core call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AuthResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("blocking task failed: {e}")))?
        .map_err(AppError::from)
}

pub(crate) fn refresh_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REFRESH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use vq_shared::errors::ErrorCode;

    #[test]
    fn reads_refresh_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(refresh_header(&headers), None);

        headers.insert("refresh", "abc123".parse().unwrap());
        assert_eq!(refresh_header(&headers).as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn blocking_maps_core_errors() {
        let err = blocking(|| -> AuthResult<()> { Err(AuthError::TokenNotFound) }).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RefreshTokenNotFound);

        assert_eq!(blocking(|| Ok(7)).await.unwrap(), 7);
    }
}
