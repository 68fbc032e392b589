use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use vq_shared::types::auth::TokenPair;

use crate::error::{AuthError, AuthResult};
use crate::services::credentials::CredentialService;
use crate::services::password;
use crate::services::refresh_ledger::{RefreshLedger, SessionContext};
use crate::services::token_service::AccessTokenIssuer;

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    #[serde(rename = "emailorusername", alias = "email")]
    pub identifier: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
    pub device: Option<String>,
    pub location: Option<String>,
}

/// Result of a logout. Access tokens are stateless, so already-issued ones
/// stay usable for up to `residual_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub all_devices: bool,
    pub residual_minutes: i64,
}

impl LogoutOutcome {
    pub fn message(&self) -> String {
        if self.all_devices {
            format!(
                "Logout successful, it might take up to {} minutes to log out of all devices completely.",
                self.residual_minutes
            )
        } else {
            format!(
                "Logout successful, it might take up to {} minutes to log out of the device completely.",
                self.residual_minutes
            )
        }
    }
}

pub struct SessionService {
    credentials: Arc<CredentialService>,
    access: Arc<AccessTokenIssuer>,
    ledger: Arc<RefreshLedger>,
}

impl SessionService {
    pub fn new(
        credentials: Arc<CredentialService>,
        access: Arc<AccessTokenIssuer>,
        ledger: Arc<RefreshLedger>,
    ) -> Self {
        Self { credentials, access, ledger }
    }

    pub fn login(&self, input: LoginInput) -> AuthResult<TokenPair> {
        let user = self.credentials.resolve(&input.identifier)?;
        if !password::verify_password(&input.password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "login rejected: wrong password");
            return Err(AuthError::WrongPassword);
        }

        let ctx = SessionContext {
            device: trimmed(input.device),
            location: trimmed(input.location),
            remember: input.remember,
        };
        let access_token = self.access.issue(user.id, ctx.remember)?;
        let refresh_token = self.ledger.issue(user.id, &ctx)?;

        tracing::info!(user_id = %user.id, remember = ctx.remember, "user logged in");
        Ok(TokenPair::new(access_token, refresh_token))
    }

    /// `presented` is the raw `Refresh` header value. Never retried here: a
    /// second attempt with the same token counts as reuse.
    pub fn refresh(&self, presented: Option<&str>) -> AuthResult<TokenPair> {
        let token = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenMissing)?;
        self.ledger.redeem(token)
    }

    pub fn logout(&self, presented: Option<&str>) -> AuthResult<LogoutOutcome> {
        let token = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenMissing)?;
        self.ledger.revoke_one(token)?;
        Ok(LogoutOutcome {
            all_devices: false,
            residual_minutes: self.access.max_residual_minutes(),
        })
    }

    pub fn logout_all(&self, user_id: Uuid) -> AuthResult<LogoutOutcome> {
        let removed = self.ledger.revoke_all(user_id)?;
        tracing::info!(user_id = %user_id, removed, "logged out of all devices");
        Ok(LogoutOutcome {
            all_devices: true,
            residual_minutes: self.access.max_residual_minutes(),
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
