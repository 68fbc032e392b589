use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use vq_shared::clients::db::{DbConn, DbPool};

use super::{CredentialStore, EphemeralTokenStore, RefreshTokenStore, StoreError, StoreResult};
use crate::models::{
    EphemeralToken, NewEphemeralToken, NewRefreshToken, NewUser, RefreshToken, TokenPurpose, User,
};
use crate::schema::{refresh_tokens, users};

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => StoreError::Conflict,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Runs `$body` with `$t` bound to the table module for `$purpose`.
macro_rules! with_ephemeral_table {
    ($purpose:expr, $t:ident => $body:expr) => {
        match $purpose {
            TokenPurpose::PasswordReset => {
                use crate::schema::forgot_passwords as $t;
                $body
            }
            TokenPurpose::EmailVerification => {
                use crate::schema::verify_emails as $t;
                $body
            }
        }
    };
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<DbConn> {
        self.pool.get().map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl CredentialStore for PgStore {
    fn find_by_id(&self, id: Uuid) -> StoreResult<User> {
        let mut conn = self.conn()?;
        Ok(users::table.find(id).first::<User>(&mut conn)?)
    }

    fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .first::<User>(&mut conn)?)
    }

    fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::username.eq(username))
            .first::<User>(&mut conn)?)
    }

    fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(users::table)
            .values(&user)
            .get_result::<User>(&mut conn)?)
    }

    fn save(&self, user: &User) -> StoreResult<User> {
        let mut conn = self.conn()?;
        Ok(diesel::update(users::table.find(user.id))
            .set((
                users::email.eq(&user.email),
                users::username.eq(&user.username),
                users::password_hash.eq(&user.password_hash),
                users::name.eq(&user.name),
                users::photo_url.eq(&user.photo_url),
                users::bio.eq(&user.bio),
                users::is_activated.eq(user.is_activated),
                users::updated_at.eq(user.updated_at),
            ))
            .get_result::<User>(&mut conn)?)
    }
}

impl RefreshTokenStore for PgStore {
    fn insert(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(refresh_tokens::table)
            .values(&token)
            .get_result::<RefreshToken>(&mut conn)?)
    }

    fn find_by_hash(&self, token_hash: &str) -> StoreResult<RefreshToken> {
        let mut conn = self.conn()?;
        Ok(refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(token_hash))
            .first::<RefreshToken>(&mut conn)?)
    }

    fn rotate(&self, old_id: Uuid, replacement: NewRefreshToken) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let rotated = conn.transaction::<bool, DieselError, _>(|conn| {
            let revoked = diesel::update(
                refresh_tokens::table
                    .filter(refresh_tokens::id.eq(old_id))
                    .filter(refresh_tokens::revoked.eq(false)),
            )
            .set(refresh_tokens::revoked.eq(true))
            .execute(conn)?;
            if revoked != 1 {
                return Ok(false);
            }

            diesel::insert_into(refresh_tokens::table)
                .values(&replacement)
                .execute(conn)?;
            Ok(true)
        })?;
        Ok(rotated)
    }

    fn delete_by_hash(&self, token_hash: &str) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        Ok(diesel::delete(refresh_tokens::table.filter(refresh_tokens::token_hash.eq(token_hash)))
            .execute(&mut conn)?)
    }

    fn delete_for_user(&self, user_id: Uuid) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        Ok(diesel::delete(refresh_tokens::table.filter(refresh_tokens::user_id.eq(user_id)))
            .execute(&mut conn)?)
    }

    fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        Ok(diesel::delete(refresh_tokens::table.filter(refresh_tokens::expires_at.lt(cutoff)))
            .execute(&mut conn)?)
    }
}

impl EphemeralTokenStore for PgStore {
    fn replace(&self, purpose: TokenPurpose, token: NewEphemeralToken) -> StoreResult<EphemeralToken> {
        let mut conn = self.conn()?;
        with_ephemeral_table!(purpose, t => {
            Ok(diesel::insert_into(t::table)
                .values((
                    t::user_id.eq(token.user_id),
                    t::token_hash.eq(&token.token_hash),
                    t::expires_at.eq(token.expires_at),
                    t::created_at.eq(token.created_at),
                ))
                .on_conflict(t::user_id)
                .do_update()
                .set((
                    t::token_hash.eq(&token.token_hash),
                    t::expires_at.eq(token.expires_at),
                    t::created_at.eq(token.created_at),
                ))
                .get_result::<EphemeralToken>(&mut conn)?)
        })
    }

    fn find_by_hash(&self, purpose: TokenPurpose, token_hash: &str) -> StoreResult<EphemeralToken> {
        let mut conn = self.conn()?;
        with_ephemeral_table!(purpose, t => {
            Ok(t::table
                .filter(t::token_hash.eq(token_hash))
                .first::<EphemeralToken>(&mut conn)?)
        })
    }

    fn delete_by_id(&self, purpose: TokenPurpose, id: Uuid) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        with_ephemeral_table!(purpose, t => {
            Ok(diesel::delete(t::table.filter(t::id.eq(id))).execute(&mut conn)?)
        })
    }

    fn delete_expired(&self, purpose: TokenPurpose, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        with_ephemeral_table!(purpose, t => {
            Ok(diesel::delete(t::table.filter(t::expires_at.lt(now))).execute(&mut conn)?)
        })
    }
}
