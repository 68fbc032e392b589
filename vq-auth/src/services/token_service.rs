use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use vq_shared::types::auth::Claims;

use crate::config::TokenSettings;
use crate::error::{AuthError, AuthResult};
use crate::services::clock::Clock;

/// Length of refresh and ephemeral tokens; 25 symbols over 62 is ~149 bits.
pub const OPAQUE_TOKEN_LEN: usize = 25;

/// Mints HS256 access tokens. Nothing is persisted; a token stays valid
/// until its `exp`.
pub struct AccessTokenIssuer {
    key: EncodingKey,
    settings: TokenSettings,
    clock: Arc<dyn Clock>,
}

impl AccessTokenIssuer {
    pub fn new(settings: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            key: EncodingKey::from_secret(&settings.secret),
            settings,
            clock,
        }
    }

    pub fn issue(&self, user_id: Uuid, remember: bool) -> AuthResult<String> {
        let claims = Claims::new(user_id, self.clock.now(), self.settings.access_ttl(remember));
        encode(&Header::default(), &claims, &self.key)
            .map_err(|e| AuthError::Crypto(format!("JWT encoding failed: {e}")))
    }

    /// Longest time an access token can outlive a logout.
    pub fn max_residual_minutes(&self) -> i64 {
        self.settings.access_ttl_remember.num_minutes()
    }
}

/// Cryptographically random alphanumeric string from the thread-local CSPRNG.
pub fn generate_opaque_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Digest under which opaque tokens are stored and looked up.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
