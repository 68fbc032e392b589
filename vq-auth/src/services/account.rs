use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{TokenPurpose, User};
use crate::services::credentials::{normalize_email, CredentialService};
use crate::services::ephemeral::EphemeralTokens;
use crate::services::password;
use crate::services::refresh_ledger::RefreshLedger;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordInput {
    #[serde(rename = "oldpassword", alias = "old_password")]
    pub old_password: String,
    #[serde(rename = "newPassword", alias = "new_password")]
    pub new_password: String,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: String,
}

/// A freshly issued out-of-band token and the address it must be sent to.
#[derive(Debug)]
pub struct PendingEmail {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

/// Password reset, email verification and password change.
pub struct AccountService {
    credentials: Arc<CredentialService>,
    tokens: EphemeralTokens,
    ledger: Arc<RefreshLedger>,
    token_ttl: Duration,
}

impl AccountService {
    pub fn new(
        credentials: Arc<CredentialService>,
        tokens: EphemeralTokens,
        ledger: Arc<RefreshLedger>,
        token_ttl: Duration,
    ) -> Self {
        Self { credentials, tokens, ledger, token_ttl }
    }

    pub fn token_ttl_minutes(&self) -> i64 {
        self.token_ttl.num_minutes()
    }

    pub fn request_password_reset(&self, email: &str) -> AuthResult<PendingEmail> {
        let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
        let user = self.credentials.resolve(&email)?;
        let token = self.tokens.issue(user.id, TokenPurpose::PasswordReset, self.token_ttl)?;

        Ok(PendingEmail { user_id: user.id, email: user.email, token })
    }

    /// Sets the new password and ends every session of the user. The link
    /// is consumed last, so a failure on the way leaves it usable.
    pub fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        password::validate_password(new_password)?;
        let row = self.tokens.peek(token.trim(), TokenPurpose::PasswordReset)?;
        let user = self.credentials.find(row.user_id)?;
        self.credentials.set_password(user, new_password)?;

        let revoked = self.ledger.revoke_all(row.user_id)?;
        self.tokens.consume(&row, TokenPurpose::PasswordReset)?;
        tracing::info!(user_id = %row.user_id, revoked, "password reset");
        Ok(())
    }

    pub fn request_email_verification(&self, user_id: Uuid) -> AuthResult<PendingEmail> {
        let user = self.credentials.find(user_id)?;
        if user.is_activated {
            return Err(AuthError::EmailAlreadyVerified);
        }
        let token = self.tokens.issue(user.id, TokenPurpose::EmailVerification, self.token_ttl)?;

        Ok(PendingEmail { user_id: user.id, email: user.email, token })
    }

    pub fn verify_email(&self, token: &str) -> AuthResult<User> {
        let user_id = self.tokens.redeem(token.trim(), TokenPurpose::EmailVerification)?;
        let user = self.credentials.mark_activated(self.credentials.find(user_id)?)?;

        tracing::info!(user_id = %user.id, "email verified");
        Ok(user)
    }

    pub fn change_password(&self, user_id: Uuid, input: ChangePasswordInput) -> AuthResult<()> {
        if input.new_password != input.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        let user = self.credentials.find(user_id)?;
        if !password::verify_password(&input.old_password, &user.password_hash) {
            return Err(AuthError::WrongPassword);
        }
        self.credentials.set_password(user, &input.new_password)?;

        tracing::info!(user_id = %user_id, "password changed");
        Ok(())
    }
}
