//! Persistence seams for the account core. Postgres backs them in production;
//! tests use the in-memory implementation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    EphemeralToken, NewEphemeralToken, NewRefreshToken, NewUser, RefreshToken, TokenPurpose, User,
};

#[cfg(test)]
pub mod memory;
pub mod pg;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    #[error("store failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait CredentialStore: Send + Sync {
    fn find_by_id(&self, id: Uuid) -> StoreResult<User>;
    fn find_by_email(&self, email: &str) -> StoreResult<User>;
    fn find_by_username(&self, username: &str) -> StoreResult<User>;
    /// Fails with `Conflict` when the email or username is taken.
    fn create(&self, user: NewUser) -> StoreResult<User>;
    /// Persists every mutable column of `user`.
    fn save(&self, user: &User) -> StoreResult<User>;
}

pub trait RefreshTokenStore: Send + Sync {
    fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;
    fn find_by_hash(&self, token_hash: &str) -> StoreResult<RefreshToken>;
    /// Marks `old_id` revoked, only if it is still unrevoked, and inserts
    /// `replacement`, as one atomic unit. Returns false, with nothing
    /// written, when the old row was already revoked.
    fn rotate(&self, old_id: Uuid, replacement: NewRefreshToken) -> StoreResult<bool>;
    fn delete_by_hash(&self, token_hash: &str) -> StoreResult<usize>;
    fn delete_for_user(&self, user_id: Uuid) -> StoreResult<usize>;
    fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}

/// Password-reset and email-verification rows, one namespace per purpose.
pub trait EphemeralTokenStore: Send + Sync {
    /// Inserts the row, replacing any existing row of the same user in one
    /// statement.
    fn replace(&self, purpose: TokenPurpose, token: NewEphemeralToken) -> StoreResult<EphemeralToken>;
    fn find_by_hash(&self, purpose: TokenPurpose, token_hash: &str) -> StoreResult<EphemeralToken>;
    /// Returns the number of rows removed; zero means someone else consumed it.
    fn delete_by_id(&self, purpose: TokenPurpose, id: Uuid) -> StoreResult<usize>;
    fn delete_expired(&self, purpose: TokenPurpose, now: DateTime<Utc>) -> StoreResult<usize>;
}
