//! services/bridge/src/adapters/token.rs
//!
//! Mints the bearer token the ChoreBoard backend expects:
//! `username:timestamp:hex(HMAC-SHA256(username:timestamp, secret))`.
//!
//! Tokens are not cached. Each request gets a fresh one, so "refreshing" a
//! rejected credential is simply minting again.

use chrono::Utc;
use choreboard_core::ports::{PortError, PortResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct TokenSigner {
    username: String,
    secret_key: String,
}

impl TokenSigner {
    pub fn new(username: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Mints a token stamped with the current time.
    pub fn mint(&self) -> PortResult<String> {
        self.mint_at(Utc::now().timestamp())
    }

    pub fn mint_at(&self, timestamp: i64) -> PortResult<String> {
        let message = format!("{}:{}", self.username, timestamp);
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| PortError::Unexpected(format!("Invalid signing key: {}", e)))?;
        mac.update(message.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}:{}", message, signature))
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("username", &self.username)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
