use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{EphemeralToken, NewEphemeralToken, TokenPurpose};
use crate::services::clock::Clock;
use crate::services::token_service::{self, OPAQUE_TOKEN_LEN};
use crate::store::{EphemeralTokenStore, StoreError};

/// Single-use, time-boxed tokens for password reset and email verification.
/// At most one live token exists per user and purpose.
pub struct EphemeralTokens {
    store: Arc<dyn EphemeralTokenStore>,
    clock: Arc<dyn Clock>,
}

impl EphemeralTokens {
    pub fn new(store: Arc<dyn EphemeralTokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn issue(&self, user_id: Uuid, purpose: TokenPurpose, ttl: Duration) -> AuthResult<String> {
        let now = self.clock.now();
        if let Err(e) = self.store.delete_expired(purpose, now) {
            tracing::warn!(error = %e, %purpose, "ephemeral token sweep failed");
        }

        let token = token_service::generate_opaque_token(OPAQUE_TOKEN_LEN);
        self.store.replace(
            purpose,
            NewEphemeralToken {
                user_id,
                token_hash: token_service::hash_token(&token),
                expires_at: now + ttl,
                created_at: now,
            },
        )?;

        tracing::debug!(user_id = %user_id, %purpose, "ephemeral token issued");
        Ok(token)
    }

    /// Deletes the token and returns its owner.
    pub fn redeem(&self, token: &str, purpose: TokenPurpose) -> AuthResult<Uuid> {
        let row = self.peek(token, purpose)?;
        self.consume(&row, purpose)?;
        Ok(row.user_id)
    }

    /// Looks up a live token without consuming it. Expired rows are removed.
    pub fn peek(&self, token: &str, purpose: TokenPurpose) -> AuthResult<EphemeralToken> {
        let row = match self.store.find_by_hash(purpose, &token_service::hash_token(token)) {
            Ok(row) => row,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidOrExpiredToken(purpose)),
            Err(e) => return Err(e.into()),
        };

        if row.expires_at < self.clock.now() {
            self.store.delete_by_id(purpose, row.id)?;
            return Err(AuthError::InvalidOrExpiredToken(purpose));
        }
        Ok(row)
    }

    /// Fails when another caller consumed the row first.
    pub fn consume(&self, row: &EphemeralToken, purpose: TokenPurpose) -> AuthResult<()> {
        match self.store.delete_by_id(purpose, row.id)? {
            0 => Err(AuthError::InvalidOrExpiredToken(purpose)),
            _ => Ok(()),
        }
    }
}
