//! Credential cache: pluggable store of previously-verified credentials.
//!
//! A cache entry is a `(created, password-hash)` pair keyed by username. The
//! plaintext credential is never stored; registration hashes it with
//! Argon2id and a fresh random salt, and every lookup re-verifies the live
//! credential against the stored hash. Entries expire lazily, on access.

pub mod file;
pub mod network;

use crate::config::CacheSettings;
use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub use file::FileCredentialCache;
pub use network::NetworkCredentialCache;

/// Result of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheVerdict {
    /// An unexpired entry exists and the supplied credential matches it.
    Match,
    /// An unexpired entry exists but the supplied credential does not match.
    Mismatch,
    /// No usable entry for this username.
    NotPresent,
}

/// A cached credential: creation time plus the salted one-way hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub created: f64,
    pub pw_hash: String,
}

impl CredentialRecord {
    /// Hash the credential with a fresh random salt and stamp the record
    /// with the current time.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub fn new(credential: &SecretString) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let pw_hash = Argon2::default()
            .hash_password(credential.expose_secret().as_bytes(), &salt)
            .map_err(|_| anyhow!("failed to hash credential"))?
            .to_string();
        Ok(Self {
            created: unix_now(),
            pw_hash,
        })
    }

    /// Whether the record's validity window has closed.
    ///
    /// Plain numeric timestamp compare; no clock-skew correction.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn is_expired(&self, lifespan: u64) -> bool {
        self.created + (lifespan as f64) < unix_now()
    }

    /// Re-verify the live credential against the stored hash.
    #[must_use]
    pub fn matches(&self, credential: &SecretString) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.pw_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(credential.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }
}

/// Store of previously-verified credentials, polymorphic over backend.
#[allow(async_fn_in_trait)]
pub trait CredentialCache {
    /// Store a new record for `username`, hashing the credential.
    ///
    /// # Errors
    /// Returns an error if the username cannot be stored safely or the
    /// backing store rejects the write.
    async fn register(&self, username: &str, credential: &SecretString) -> Result<()>;

    /// Look up `username` and re-verify the supplied credential.
    ///
    /// An expired entry is deleted as a side effect and reported as
    /// [`CacheVerdict::NotPresent`].
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be reached.
    async fn authenticate(&self, username: &str, credential: &SecretString)
        -> Result<CacheVerdict>;

    /// Wipe all entries for this backend instance.
    ///
    /// # Errors
    /// Returns an error if the backing store rejects the wipe.
    async fn clear(&self) -> Result<()>;
}

/// Cache backend selected by configuration at construction.
#[derive(Debug)]
pub enum CacheBackend {
    File(FileCredentialCache),
    Network(NetworkCredentialCache),
}

impl CacheBackend {
    /// Build the configured backend, or `None` when caching is disabled.
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Option<Self> {
        match settings {
            CacheSettings::None => None,
            CacheSettings::File { path, lifespan } => Some(Self::File(
                FileCredentialCache::new(path.clone(), *lifespan),
            )),
            CacheSettings::Network {
                host,
                port,
                key_prefix,
                debug,
                lifespan,
            } => Some(Self::Network(NetworkCredentialCache::new(
                host.clone(),
                *port,
                key_prefix.clone(),
                *lifespan,
                *debug,
            ))),
        }
    }
}

impl CredentialCache for CacheBackend {
    async fn register(&self, username: &str, credential: &SecretString) -> Result<()> {
        match self {
            Self::File(cache) => cache.register(username, credential).await,
            Self::Network(cache) => cache.register(username, credential).await,
        }
    }

    async fn authenticate(
        &self,
        username: &str,
        credential: &SecretString,
    ) -> Result<CacheVerdict> {
        match self {
            Self::File(cache) => cache.authenticate(username, credential).await,
            Self::Network(cache) => cache.authenticate(username, credential).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Self::File(cache) => cache.clear().await,
            Self::Network(cache) => cache.clear().await,
        }
    }
}

/// Reject usernames that could forge records or corrupt a backing store.
///
/// The flat-file format delimits fields with `::` and records with
/// newlines; the network backend embeds the username in a protocol key.
/// Whitespace and control characters are never valid in a login name.
pub(crate) fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(anyhow!("empty username"));
    }
    if username.contains("::") {
        return Err(anyhow!("username contains the field delimiter"));
    }
    if username
        .chars()
        .any(|ch| ch.is_whitespace() || ch.is_control())
    {
        return Err(anyhow!("username contains whitespace or control characters"));
    }
    Ok(())
}

/// Seconds since the Unix epoch, as a float.
#[must_use]
pub(crate) fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
