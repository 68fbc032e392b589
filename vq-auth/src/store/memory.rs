use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CredentialStore, EphemeralTokenStore, RefreshTokenStore, StoreError, StoreResult};
use crate::models::{
    EphemeralToken, NewEphemeralToken, NewRefreshToken, NewUser, RefreshToken, TokenPurpose, User,
};

/// Mutex-guarded tables with the same unique and cascade rules as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    refresh_tokens: Mutex<Vec<RefreshToken>>,
    ephemeral: Mutex<HashMap<TokenPurpose, Vec<EphemeralToken>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_rows_for(&self, user_id: Uuid) -> Vec<RefreshToken> {
        self.refresh_tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn refresh_row_count(&self) -> usize {
        self.refresh_tokens.lock().unwrap().len()
    }

    pub fn ephemeral_rows(&self, purpose: TokenPurpose) -> Vec<EphemeralToken> {
        self.ephemeral
            .lock()
            .unwrap()
            .get(&purpose)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes the user and everything that references it.
    pub fn delete_user(&self, id: Uuid) {
        self.users.lock().unwrap().retain(|u| u.id != id);
        self.refresh_tokens.lock().unwrap().retain(|t| t.user_id != id);
        for rows in self.ephemeral.lock().unwrap().values_mut() {
            rows.retain(|t| t.user_id != id);
        }
    }
}

impl CredentialStore for MemoryStore {
    fn find_by_id(&self, id: Uuid) -> StoreResult<User> {
        let users = self.users.lock().unwrap();
        users.iter().find(|u| u.id == id).cloned().ok_or(StoreError::NotFound)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let users = self.users.lock().unwrap();
        users.iter().find(|u| u.email == email).cloned().ok_or(StoreError::NotFound)
    }

    fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let users = self.users.lock().unwrap();
        users.iter().find(|u| u.username == username).cloned().ok_or(StoreError::NotFound)
    }

    fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email || u.username == user.username) {
            return Err(StoreError::Conflict);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            name: user.name,
            photo_url: None,
            bio: String::new(),
            is_activated: false,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        users.push(created.clone());
        Ok(created)
    }

    fn save(&self, user: &User) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        let clash = users
            .iter()
            .any(|u| u.id != user.id && (u.email == user.email || u.username == user.username));
        if clash {
            return Err(StoreError::Conflict);
        }
        let slot = users.iter_mut().find(|u| u.id == user.id).ok_or(StoreError::NotFound)?;
        *slot = user.clone();
        Ok(user.clone())
    }
}

impl RefreshTokenStore for MemoryStore {
    fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        self.check_user(token.user_id)?;
        let mut rows = self.refresh_tokens.lock().unwrap();
        if rows.iter().any(|t| t.token_hash == token.token_hash) {
            return Err(StoreError::Conflict);
        }
        let row = refresh_row(token);
        rows.push(row.clone());
        Ok(row)
    }

    fn find_by_hash(&self, token_hash: &str) -> StoreResult<RefreshToken> {
        let rows = self.refresh_tokens.lock().unwrap();
        rows.iter().find(|t| t.token_hash == token_hash).cloned().ok_or(StoreError::NotFound)
    }

    fn rotate(&self, old_id: Uuid, replacement: NewRefreshToken) -> StoreResult<bool> {
        self.check_user(replacement.user_id)?;
        let mut rows = self.refresh_tokens.lock().unwrap();
        let Some(old) = rows.iter().position(|t| t.id == old_id && !t.revoked) else {
            return Ok(false);
        };
        if rows.iter().any(|t| t.token_hash == replacement.token_hash) {
            return Err(StoreError::Conflict);
        }
        rows[old].revoked = true;
        rows.push(refresh_row(replacement));
        Ok(true)
    }

    fn delete_by_hash(&self, token_hash: &str) -> StoreResult<usize> {
        let mut rows = self.refresh_tokens.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.token_hash != token_hash);
        Ok(before - rows.len())
    }

    fn delete_for_user(&self, user_id: Uuid) -> StoreResult<usize> {
        let mut rows = self.refresh_tokens.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.user_id != user_id);
        Ok(before - rows.len())
    }

    fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut rows = self.refresh_tokens.lock().unwrap();
        let before = rows.len();
        rows.retain(|t| t.expires_at >= cutoff);
        Ok(before - rows.len())
    }
}

impl EphemeralTokenStore for MemoryStore {
    fn replace(&self, purpose: TokenPurpose, token: NewEphemeralToken) -> StoreResult<EphemeralToken> {
        let mut tables = self.ephemeral.lock().unwrap();
        let rows = tables.entry(purpose).or_default();
        if rows.iter().any(|t| t.token_hash == token.token_hash && t.user_id != token.user_id) {
            return Err(StoreError::Conflict);
        }
        rows.retain(|t| t.user_id != token.user_id);
        let row = EphemeralToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            created_at: token.created_at,
        };
        rows.push(row.clone());
        Ok(row)
    }

    fn find_by_hash(&self, purpose: TokenPurpose, token_hash: &str) -> StoreResult<EphemeralToken> {
        let tables = self.ephemeral.lock().unwrap();
        tables
            .get(&purpose)
            .and_then(|rows| rows.iter().find(|t| t.token_hash == token_hash))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete_by_id(&self, purpose: TokenPurpose, id: Uuid) -> StoreResult<usize> {
        Ok(self.retain_ephemeral(purpose, |t| t.id != id))
    }

    fn delete_expired(&self, purpose: TokenPurpose, now: DateTime<Utc>) -> StoreResult<usize> {
        Ok(self.retain_ephemeral(purpose, |t| t.expires_at >= now))
    }
}

fn refresh_row(token: NewRefreshToken) -> RefreshToken {
    RefreshToken {
        id: Uuid::new_v4(),
        user_id: token.user_id,
        token_hash: token.token_hash,
        device: token.device,
        location: token.location,
        remember: token.remember,
        revoked: false,
        expires_at: token.expires_at,
        created_at: token.created_at,
    }
}

impl MemoryStore {
    fn check_user(&self, user_id: Uuid) -> StoreResult<()> {
        if self.users.lock().unwrap().iter().any(|u| u.id == user_id) {
            Ok(())
        } else {
            Err(StoreError::Backend("foreign key violation on refresh_tokens.user_id".into()))
        }
    }

    fn retain_ephemeral(&self, purpose: TokenPurpose, keep: impl Fn(&EphemeralToken) -> bool) -> usize {
        let mut tables = self.ephemeral.lock().unwrap();
        let Some(rows) = tables.get_mut(&purpose) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|t| keep(t));
        before - rows.len()
    }
}

/// Delegates to a [`MemoryStore`] but fails the next call of one armed
/// operation with a backend error, leaving the inner store untouched.
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    armed: Mutex<Option<&'static str>>,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner, armed: Mutex::new(None) }
    }

    pub fn fail_next(&self, op: &'static str) {
        *self.armed.lock().unwrap() = Some(op);
    }

    fn trip(&self, op: &'static str) -> StoreResult<()> {
        let mut armed = self.armed.lock().unwrap();
        if *armed == Some(op) {
            *armed = None;
            return Err(StoreError::Backend(format!("{op}: pool timed out")));
        }
        Ok(())
    }
}

impl CredentialStore for FailingStore {
    fn find_by_id(&self, id: Uuid) -> StoreResult<User> {
        self.trip("find_by_id")?;
        self.inner.find_by_id(id)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<User> {
        self.trip("find_by_email")?;
        self.inner.find_by_email(email)
    }

    fn find_by_username(&self, username: &str) -> StoreResult<User> {
        self.trip("find_by_username")?;
        self.inner.find_by_username(username)
    }

    fn create(&self, user: NewUser) -> StoreResult<User> {
        self.trip("create")?;
        self.inner.create(user)
    }

    fn save(&self, user: &User) -> StoreResult<User> {
        self.trip("save")?;
        self.inner.save(user)
    }
}

impl RefreshTokenStore for FailingStore {
    fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        self.trip("refresh.insert")?;
        RefreshTokenStore::insert(&*self.inner, token)
    }

    fn find_by_hash(&self, token_hash: &str) -> StoreResult<RefreshToken> {
        self.trip("refresh.find_by_hash")?;
        RefreshTokenStore::find_by_hash(&*self.inner, token_hash)
    }

    fn rotate(&self, old_id: Uuid, replacement: NewRefreshToken) -> StoreResult<bool> {
        self.trip("rotate")?;
        self.inner.rotate(old_id, replacement)
    }

    fn delete_by_hash(&self, token_hash: &str) -> StoreResult<usize> {
        self.trip("delete_by_hash")?;
        self.inner.delete_by_hash(token_hash)
    }

    fn delete_for_user(&self, user_id: Uuid) -> StoreResult<usize> {
        self.trip("delete_for_user")?;
        self.inner.delete_for_user(user_id)
    }

    fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        self.trip("delete_expired_before")?;
        self.inner.delete_expired_before(cutoff)
    }
}

impl EphemeralTokenStore for FailingStore {
    fn replace(&self, purpose: TokenPurpose, token: NewEphemeralToken) -> StoreResult<EphemeralToken> {
        self.trip("ephemeral.replace")?;
        self.inner.replace(purpose, token)
    }

    fn find_by_hash(&self, purpose: TokenPurpose, token_hash: &str) -> StoreResult<EphemeralToken> {
        self.trip("ephemeral.find_by_hash")?;
        EphemeralTokenStore::find_by_hash(&*self.inner, purpose, token_hash)
    }

    fn delete_by_id(&self, purpose: TokenPurpose, id: Uuid) -> StoreResult<usize> {
        self.trip("ephemeral.delete_by_id")?;
        self.inner.delete_by_id(purpose, id)
    }

    fn delete_expired(&self, purpose: TokenPurpose, now: DateTime<Utc>) -> StoreResult<usize> {
        self.trip("ephemeral.delete_expired")?;
        self.inner.delete_expired(purpose, now)
    }
}
