//! Refresh-token lifecycle: issue, single-use rotation with reuse detection,
//! and revocation.
//!
//! A row is live while `revoked == false` and `expires_at >= now`. Rotation
//! marks the presented row revoked and keeps it, so a second presentation of
//! the same token is recognised as reuse. Logout deletes rows outright.
//!
//! Rotation goes through [`RefreshTokenStore::rotate`], which flips the flag
//! and inserts the successor as one unit: of two concurrent redemptions of
//! one token only the call that flips the flag mints a new pair, and a
//! failed rotation leaves the presented token live. Everything that can
//! fail before that (user lookup, signing) happens first. A client that
//! retries a refresh after losing a successful response will see a reuse
//! error and has to log in again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vq_shared::types::auth::TokenPair;

use crate::config::TokenSettings;
use crate::error::{AuthError, AuthResult};
use crate::models::{NewRefreshToken, RefreshToken};
use crate::services::clock::Clock;
use crate::services::token_service::{self, AccessTokenIssuer, OPAQUE_TOKEN_LEN};
use crate::store::{CredentialStore, RefreshTokenStore, StoreError};

/// Where and how a session was opened; carried over on every rotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub device: Option<String>,
    pub location: Option<String>,
    pub remember: bool,
}

pub struct RefreshLedger {
    tokens: Arc<dyn RefreshTokenStore>,
    users: Arc<dyn CredentialStore>,
    access: Arc<AccessTokenIssuer>,
    settings: TokenSettings,
    clock: Arc<dyn Clock>,
}

impl RefreshLedger {
    pub fn new(
        tokens: Arc<dyn RefreshTokenStore>,
        users: Arc<dyn CredentialStore>,
        access: Arc<AccessTokenIssuer>,
        settings: TokenSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { tokens, users, access, settings, clock }
    }

    /// Persists a new live token and returns its plaintext. Rows that expired
    /// more than one remembered lifetime ago are purged on the way.
    pub fn issue(&self, user_id: Uuid, ctx: &SessionContext) -> AuthResult<String> {
        let now = self.clock.now();
        self.purge_stale(now);

        let (token, row) = self.new_row(user_id, ctx, now);
        self.tokens.insert(row)?;
        Ok(token)
    }

    /// Consumes `token` and returns a fresh access/refresh pair for the same
    /// session context.
    pub fn redeem(&self, token: &str) -> AuthResult<TokenPair> {
        let stored = self
            .tokens
            .find_by_hash(&token_service::hash_token(token))
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::TokenNotFound,
                other => other.into(),
            })?;

        let now = self.clock.now();
        if stored.expires_at < now {
            return Err(AuthError::TokenExpired);
        }
        if stored.revoked {
            return Err(reuse_detected(&stored));
        }

        let user = self.users.find_by_id(stored.user_id).map_err(|e| match e {
            StoreError::NotFound => AuthError::TokenNotFound,
            other => other.into(),
        })?;

        let ctx = SessionContext {
            device: stored.device.clone(),
            location: stored.location.clone(),
            remember: stored.remember,
        };
        let access_token = self.access.issue(user.id, ctx.remember)?;

        self.purge_stale(now);
        let (refresh_token, row) = self.new_row(user.id, &ctx, now);
        if !self.tokens.rotate(stored.id, row)? {
            return Err(reuse_detected(&stored));
        }

        tracing::debug!(user_id = %user.id, "refresh token rotated");
        Ok(TokenPair::new(access_token, refresh_token))
    }

    /// Deletes every token of the user. Returns the number of rows removed.
    pub fn revoke_all(&self, user_id: Uuid) -> AuthResult<usize> {
        Ok(self.tokens.delete_for_user(user_id)?)
    }

    pub fn revoke_one(&self, token: &str) -> AuthResult<()> {
        match self.tokens.delete_by_hash(&token_service::hash_token(token))? {
            0 => Err(AuthError::TokenNotFound),
            _ => Ok(()),
        }
    }

    /// Best effort; a failure is logged and never blocks issuing.
    fn purge_stale(&self, now: DateTime<Utc>) {
        match self.tokens.delete_expired_before(now - self.settings.refresh_ttl_remember) {
            Ok(0) => {}
            Ok(purged) => tracing::debug!(purged, "purged stale refresh tokens"),
            Err(e) => tracing::warn!(error = %e, "refresh token purge failed"),
        }
    }

    fn new_row(&self, user_id: Uuid, ctx: &SessionContext, now: DateTime<Utc>) -> (String, NewRefreshToken) {
        let token = token_service::generate_opaque_token(OPAQUE_TOKEN_LEN);
        let row = NewRefreshToken {
            user_id,
            token_hash: token_service::hash_token(&token),
            device: ctx.device.clone(),
            location: ctx.location.clone(),
            remember: ctx.remember,
            expires_at: now + self.settings.refresh_ttl(ctx.remember),
            created_at: now,
        };
        (token, row)
    }
}

fn reuse_detected(stored: &RefreshToken) -> AuthError {
    tracing::warn!(
        user_id = %stored.user_id,
        token_id = %stored.id,
        device = stored.device.as_deref().unwrap_or("-"),
        "refresh token reuse detected"
    );
    AuthError::TokenReuseDetected
}
