//! The ordered policy pipeline for one login attempt.

use super::gate::{GateOutcome, GroupMembershipGate};
use super::Decision;
use crate::cache::{CacheBackend, CacheVerdict, CredentialCache};
use crate::config::AuthConfig;
use crate::directory::{qualified_identity, DirectoryService, LoginOutcome};
use anyhow::Result;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};

/// Decides, for a single login attempt, whether the supplied credential
/// should be accepted.
///
/// One engine invocation is a single synchronous, sequential pipeline,
/// terminal on its first short-circuit. Collaborator failures never
/// propagate past [`decide`](Self::decide); they become [`Decision`]
/// values.
pub struct AuthDecisionEngine<D> {
    config: AuthConfig,
    directory: D,
    cache: Option<CacheBackend>,
}

impl<D: DirectoryService> AuthDecisionEngine<D> {
    /// Build an engine from configuration, constructing the configured
    /// cache backend.
    #[must_use]
    pub fn new(config: AuthConfig, directory: D) -> Self {
        let cache = CacheBackend::from_settings(&config.cache);
        Self {
            config,
            directory,
            cache,
        }
    }

    /// The credential prompt to show when the host has not already
    /// collected one.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.config.prompt
    }

    /// Run the pipeline for one attempt.
    ///
    /// `supply_credential` is invoked at most once, and only when neither
    /// the unconfigured nor the excluded short-circuit applies.
    pub async fn decide<S>(&self, username: &str, supply_credential: S) -> Decision
    where
        S: FnOnce() -> Result<SecretString>,
    {
        debug!("starting directory authentication: {username}");

        // 1. Without the essential settings, defer to the next mechanism.
        let Some(essentials) = self.config.essentials() else {
            info!("directory authentication is not configured");
            return Decision::Ignored;
        };

        // 2. Excluded users are ignored before any credential is requested.
        if self.config.is_excluded(username) {
            info!("user is in excluded list: {username}");
            return Decision::Ignored;
        }

        // 3. Acquire the credential.
        let credential = match supply_credential() {
            Ok(credential) => credential,
            Err(err) => {
                error!("credential acquisition failed for {username}: {err:#}");
                return Decision::ServiceError;
            }
        };

        // 4. A cached answer skips the group check and the remote call
        //    entirely. A mismatch is terminal: the live credential differs
        //    from the one last verified remotely.
        if let Some(cache) = &self.cache {
            debug!("checking authentication cache: {username}");
            match cache.authenticate(username, &credential).await {
                Ok(CacheVerdict::Match) => {
                    info!("authentication (via cache) succeeded: {username}");
                    return Decision::Success;
                }
                Ok(CacheVerdict::Mismatch) => {
                    info!("authentication (via cache) failed: {username}");
                    return Decision::Rejected;
                }
                Ok(CacheVerdict::NotPresent) => {
                    debug!("no entry in authentication cache: {username}");
                }
                Err(err) => {
                    // An unreachable cache must not lock out a legitimate
                    // login; fall through to remote verification.
                    warn!("cache lookup failed for {username}: {err:#}");
                }
            }
        }

        // 5. Group gate. Checked after the cache so a cached success never
        //    incurs a membership lookup, and before the remote call so a
        //    user who would be rejected anyway never triggers one.
        let gate = GroupMembershipGate::new(&self.config.groups);
        let admin_identity = qualified_identity(essentials.admin_username, essentials.domain);
        match gate
            .evaluate(
                &self.directory,
                &admin_identity,
                essentials.admin_password,
                username,
            )
            .await
        {
            GateOutcome::Allowed => {}
            GateOutcome::NotMember | GateOutcome::AdminDenied => return Decision::Rejected,
            GateOutcome::Unavailable(err) => {
                error!("group membership check failed for {username}: {err}");
                return Decision::ServiceError;
            }
        }

        // 6. Remote verification with the domain-qualified identity.
        let identity = qualified_identity(username, essentials.domain);
        match self.directory.login(&identity, &credential).await {
            Ok(LoginOutcome::Success) => {}
            Ok(LoginOutcome::BadCredential) => {
                info!("authentication failed for: {username}");
                return Decision::Rejected;
            }
            Ok(LoginOutcome::ChallengeRequired) => {
                error!("verification challenge required: {username}");
                return Decision::Rejected;
            }
            Err(err) => {
                error!("unexpected directory failure for {username}: {err}");
                return Decision::ServiceError;
            }
        }

        // 7. Store the good credential in the cache.
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.register(username, &credential).await {
                error!("failed to register cache entry for {username}: {err:#}");
                return Decision::ServiceError;
            }
        }

        info!("authentication succeeded: {username}");
        Decision::Success
    }
}
