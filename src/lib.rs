//! # Dirpam (Directory-Backed PAM Authentication)
//!
//! `dirpam` decides, for a single login attempt, whether a supplied credential
//! should be accepted. Identity verification is delegated to a remote
//! directory service; repeated remote calls are short-circuited through a
//! time-bounded local credential cache, and group membership is enforced
//! before the remote verification is ever attempted.
//!
//! ## Decision Pipeline
//!
//! One attempt runs a single-pass pipeline, terminal on the first
//! short-circuit:
//!
//! 1. Missing essential configuration (`domain`, `admin-username`,
//!    `admin-password`) defers to the next authentication mechanism.
//! 2. Excluded users are ignored before any credential is requested.
//! 3. The credential is acquired at most once, via a deferred callback.
//! 4. A cached record, if configured, answers without touching the network:
//!    a match succeeds, a mismatch rejects.
//! 5. Group membership (any of the configured groups) gates the remote call.
//! 6. Remote verification against the directory service.
//! 7. Good credentials are registered in the cache, hashed, never plaintext.
//!
//! ## Credential Cache
//!
//! Two interchangeable backends store `(created, password-hash)` records per
//! username: a line-oriented flat file and a networked key-value store.
//! Records are Argon2id-hashed with a fresh random salt, re-verified against
//! the live credential on every hit, and expire lazily on access.
//!
//! The host plugin runtime is an external collaborator: the [`pam`] module is
//! a narrow adapter that translates engine decisions into the host's status
//! codes, and the engine itself has no dependency on the host calling
//! convention.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod directory;
pub mod pam;
pub mod provision;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
