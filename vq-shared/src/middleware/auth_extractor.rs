use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

/// Checks HS256 signature and expiry of access tokens. Built once from the
/// process-wide secret and handed to the router state.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired, "token has expired")
            }
            _ => AppError::new(ErrorCode::TokenInvalid, "invalid token"),
        })?;

        Ok(token_data.claims)
    }
}

/// Router state that can hand out the access-token verifier.
pub trait HasJwtVerifier {
    fn jwt_verifier(&self) -> &JwtVerifier;
}

impl<T: HasJwtVerifier> HasJwtVerifier for Arc<T> {
    fn jwt_verifier(&self) -> &JwtVerifier {
        (**self).jwt_verifier()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: HasJwtVerifier + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = state.jwt_verifier().verify(&token)?;

        if claims.is_expired_at(chrono::Utc::now()) {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::unauthorized("missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::unauthorized("authorization header must use Bearer scheme"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &[u8] = b"test-secret";

    struct TestState {
        verifier: JwtVerifier,
    }

    impl HasJwtVerifier for TestState {
        fn jwt_verifier(&self) -> &JwtVerifier {
            &self.verifier
        }
    }

    fn sign(claims: &Claims, secret: &[u8]) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    async fn extract(header: Option<String>) -> Result<AuthUser, AppError> {
        let state = Arc::new(TestState { verifier: JwtVerifier::new(SECRET) });
        let mut builder = Request::builder().uri("/me");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, &state).await
    }

    #[tokio::test]
    async fn valid_token_yields_user() {
        let user_id = Uuid::new_v4();
        let token = sign(&Claims::new(user_id, Utc::now(), Duration::minutes(5)), SECRET);

        let user = extract(Some(format!("Bearer {token}"))).await.unwrap();
        assert_eq!(user.id, user_id);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let token = sign(&Claims::new(Uuid::new_v4(), Utc::now(), Duration::minutes(5)), b"other-secret");

        let err = extract(Some(format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::minutes(10);
        let token = sign(&Claims::new(Uuid::new_v4(), issued, Duration::minutes(5)), SECRET);

        let err = extract(Some(format!("Bearer {token}"))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
    }

    #[tokio::test]
    async fn missing_or_malformed_header() {
        assert_eq!(extract(None).await.unwrap_err().code(), ErrorCode::Unauthorized);
        assert_eq!(
            extract(Some("Basic dXNlcjpwYXNz".into())).await.unwrap_err().code(),
            ErrorCode::Unauthorized
        );
    }
}
