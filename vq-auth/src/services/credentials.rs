use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::models::{NewUser, User};
use crate::services::clock::Clock;
use crate::services::password;
use crate::store::{CredentialStore, StoreError};

/// Trimmed, lowercased email if it is syntactically valid.
pub fn normalize_email(raw: &str) -> Option<String> {
    let candidate = raw.trim().to_lowercase();
    validator::validate_email(candidate.as_str()).then_some(candidate)
}

pub fn is_email(s: &str) -> bool {
    normalize_email(s).is_some()
}

fn not_found_as_user(err: StoreError) -> AuthError {
    match err {
        StoreError::NotFound => AuthError::UserNotFound,
        other => other.into(),
    }
}

fn conflict_as_duplicate(err: StoreError) -> AuthError {
    match err {
        StoreError::Conflict => AuthError::Conflict,
        other => other.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupInput {
    #[serde(default)]
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    #[serde(alias = "photourl")]
    pub photo_url: Option<String>,
    pub bio: Option<String>,
}

/// User records: lookup by identifier, signup, profile and password changes.
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn find(&self, user_id: Uuid) -> AuthResult<User> {
        self.store.find_by_id(user_id).map_err(not_found_as_user)
    }

    /// An identifier that is a valid email is looked up by email only,
    /// anything else by username only.
    pub fn resolve(&self, identifier: &str) -> AuthResult<User> {
        let identifier = identifier.trim();
        let found = match normalize_email(identifier) {
            Some(email) => self.store.find_by_email(&email),
            None => self.store.find_by_username(identifier),
        };
        found.map_err(not_found_as_user)
    }

    pub fn register(&self, input: SignupInput) -> AuthResult<User> {
        let username = input.username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidInput("Username is required".into()));
        }
        if is_email(username) {
            return Err(AuthError::UsernameIsEmail);
        }
        let email = normalize_email(&input.email).ok_or(AuthError::InvalidEmail)?;
        password::validate_password(&input.password)?;

        let now = self.clock.now();
        let new_user = NewUser {
            email,
            username: username.to_string(),
            password_hash: password::hash_password(&input.password)?,
            name: input.name.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        let user = self.store.create(new_user).map_err(conflict_as_duplicate)?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub fn username_available(&self, username: &str) -> AuthResult<bool> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidInput("Username is required".into()));
        }
        match self.store.find_by_username(username) {
            Ok(_) => Ok(false),
            Err(StoreError::NotFound) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> AuthResult<User> {
        let mut user = self.find(user_id)?;

        // Unparseable addresses leave the current one in place.
        if let Some(email) = update.email.as_deref().and_then(normalize_email) {
            if email != user.email {
                user.email = email;
                user.is_activated = false;
            }
        }
        if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
            user.name = name;
        }
        if let Some(username) = update.username.filter(|u| !u.trim().is_empty()) {
            if is_email(&username) {
                return Err(AuthError::UsernameIsEmail);
            }
            user.username = username;
        }
        if let Some(photo_url) = update.photo_url.filter(|p| !p.trim().is_empty()) {
            user.photo_url = Some(photo_url.trim().to_string());
        }
        if let Some(bio) = update.bio {
            user.bio = bio;
        }
        user.trim();
        user.updated_at = self.clock.now();

        self.store.save(&user).map_err(conflict_as_duplicate)
    }

    pub fn set_password(&self, mut user: User, new_password: &str) -> AuthResult<User> {
        password::validate_password(new_password)?;
        user.password_hash = password::hash_password(new_password)?;
        user.updated_at = self.clock.now();
        self.store.save(&user).map_err(conflict_as_duplicate)
    }

    pub fn mark_activated(&self, mut user: User) -> AuthResult<User> {
        user.is_activated = true;
        user.updated_at = self.clock.now();
        self.store.save(&user).map_err(conflict_as_duplicate)
    }
}
