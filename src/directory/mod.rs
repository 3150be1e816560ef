//! Remote directory service collaborator.
//!
//! The directory is the ground truth for identity verification and group
//! membership. The decision engine only depends on the [`DirectoryService`]
//! trait; [`http::HttpDirectoryClient`] is the production implementation and
//! tests substitute in-crate fakes.

pub mod http;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

/// Outcome of a login-verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// The credential was wrong.
    BadCredential,
    /// The directory demands an interactive step-up (for example a second
    /// factor). Cannot be satisfied non-interactively.
    ChallengeRequired,
}

/// Typed collaborator failures.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The querying identity lacks the privilege to answer.
    #[error("authorization denied")]
    AuthorizationDenied,
    /// Admin credentials were rejected.
    #[error("unauthorized")]
    Unauthorized,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
    #[error("invalid directory response: {0}")]
    InvalidResponse(String),
}

/// An authenticated admin session, obtained once per gate or provisioning
/// run and never cached across invocations.
#[derive(Debug, Clone)]
pub struct AdminSession {
    token: SecretString,
}

impl AdminSession {
    #[must_use]
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }

    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Directory user metadata, used for provisioning.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryUser {
    pub username: String,
    pub given_name: String,
    pub family_name: String,
}

impl DirectoryUser {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name)
    }
}

/// Identity and group-membership service consulted for ground-truth
/// verification.
#[allow(async_fn_in_trait)]
pub trait DirectoryService {
    /// Exchange admin credentials for a session.
    async fn login_as_admin(
        &self,
        identity: &str,
        credential: &SecretString,
    ) -> Result<AdminSession, DirectoryError>;

    /// Verify a user credential against the directory.
    async fn login(
        &self,
        identity: &str,
        credential: &SecretString,
    ) -> Result<LoginOutcome, DirectoryError>;

    /// Whether `username` belongs to `group`.
    ///
    /// Fails with [`DirectoryError::AuthorizationDenied`] when the querying
    /// admin lacks the rights to answer.
    async fn is_member(
        &self,
        session: &AdminSession,
        username: &str,
        group: &str,
    ) -> Result<bool, DirectoryError>;

    /// All member identities of `group`.
    async fn list_members(
        &self,
        session: &AdminSession,
        group: &str,
    ) -> Result<Vec<String>, DirectoryError>;

    /// Metadata for a single user.
    async fn fetch_user(
        &self,
        session: &AdminSession,
        username: &str,
    ) -> Result<DirectoryUser, DirectoryError>;
}

/// Domain-qualified identity, `user@domain`.
#[must_use]
pub fn qualified_identity(username: &str, domain: &str) -> String {
    format!("{username}@{domain}")
}
