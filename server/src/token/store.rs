//! Access token store
//!
//! Process-wide map from opaque token values to their scope and expiry.
//! Tokens are minted by the `/roulette` slash command and gate every
//! guild-scoped API request. Nothing is persisted across restarts.

use metrics::{counter, gauge};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Number of random bytes backing a token value (hex-encoded on the wire).
const TOKEN_BYTES: usize = 32;

/// Wall-clock source, injectable so expiry can be tested without sleeping.
pub trait Clock: Send + Sync {
    /// Current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Default clock backed by `SystemTime`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Token validation errors
///
/// An unknown token and a malformed token both map to `Invalid`; the
/// response must not reveal whether a similar token exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("access token required")]
    Missing,

    #[error("invalid access token")]
    Invalid,

    #[error("access token has expired")]
    Expired,
}

impl AuthError {
    /// Machine-distinguishable reason code carried in 401 responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing",
            AuthError::Invalid => "invalid",
            AuthError::Expired => "expired",
        }
    }
}

/// The only resource a token may read: one guild, for one issuing user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScope {
    pub guild_id: String,
    pub issuing_user_id: String,
}

#[derive(Debug, Clone)]
struct TokenEntry {
    scope: TokenScope,
    issued_at: u64,
    expires_at: u64,
}

/// A freshly issued token, ready to be embedded in a roulette URL.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Token store: issues, validates and expires access tokens.
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new token bound to `scope`, valid for the configured TTL.
    pub async fn issue(&self, scope: TokenScope) -> IssuedToken {
        let value = generate_token_value();
        let issued_at = self.clock.now_millis();
        let expires_at = issued_at + self.ttl.as_millis() as u64;

        let live = {
            let mut tokens = self.tokens.write().await;
            tokens.insert(
                value.clone(),
                TokenEntry {
                    scope: scope.clone(),
                    issued_at,
                    expires_at,
                },
            );
            tokens.len()
        };

        counter!("voiceroulette_tokens_issued_total").increment(1);
        gauge!("voiceroulette_tokens_live").set(live as f64);

        info!(
            guild_id = %scope.guild_id,
            user_id = %scope.issuing_user_id,
            "issued roulette token"
        );

        IssuedToken {
            value,
            issued_at,
            expires_at,
        }
    }

    /// Resolve a token to its scope.
    ///
    /// Expiry is checked against the clock, never against mere presence in
    /// the map; an expired entry is dropped on the read that discovers it.
    pub async fn validate(&self, value: &str) -> Result<TokenScope, AuthError> {
        let mut tokens = self.tokens.write().await;

        let entry = tokens.get(value).ok_or(AuthError::Invalid)?;

        if self.clock.now_millis() >= entry.expires_at {
            tokens.remove(value);
            counter!("voiceroulette_tokens_expired_total").increment(1);
            return Err(AuthError::Expired);
        }

        Ok(entry.scope.clone())
    }

    /// Remove every token past its expiry. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut tokens = self.tokens.write().await;

        let expired: Vec<String> = tokens
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(value, _)| value.clone())
            .collect();

        for value in &expired {
            if let Some(entry) = tokens.remove(value) {
                debug!(
                    token_prefix = &value[..8.min(value.len())],
                    age_ms = now.saturating_sub(entry.issued_at),
                    "dropped expired token"
                );
                counter!("voiceroulette_tokens_expired_total").increment(1);
            }
        }

        gauge!("voiceroulette_tokens_live").set(tokens.len() as f64);
        expired.len()
    }

    pub async fn token_count(&self) -> usize {
        let tokens = self.tokens.read().await;
        tokens.len()
    }
}

/// Generate an unguessable token value: 32 bytes from a CSPRNG, hex-encoded.
fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
