//! Group-membership gate.
//!
//! Thin adapter over the directory's membership query with multi-group OR
//! semantics: the attempt passes if the user belongs to any configured
//! group. An empty group set means no restriction. An authorization-denied
//! answer from the directory fails the whole attempt closed.

use crate::directory::{AdminSession, DirectoryError, DirectoryService};
use secrecy::SecretString;
use tracing::{debug, error, info};

/// Outcome of evaluating the gate for one username.
#[derive(Debug)]
pub enum GateOutcome {
    /// No restriction configured, or the user belongs to a configured group.
    Allowed,
    /// The user belongs to none of the configured groups.
    NotMember,
    /// The querying admin identity lacks the privilege to answer.
    AdminDenied,
    /// The directory could not be consulted.
    Unavailable(DirectoryError),
}

pub struct GroupMembershipGate<'a> {
    groups: &'a [String],
}

impl<'a> GroupMembershipGate<'a> {
    #[must_use]
    pub fn new(groups: &'a [String]) -> Self {
        Self { groups }
    }

    /// Whether any group restriction is configured at all.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Evaluate membership for `username`, logging the specific cause of
    /// every non-allowed outcome.
    pub async fn evaluate<D: DirectoryService>(
        &self,
        directory: &D,
        admin_identity: &str,
        admin_password: &SecretString,
        username: &str,
    ) -> GateOutcome {
        if !self.is_enforced() {
            return GateOutcome::Allowed;
        }

        let session = match directory.login_as_admin(admin_identity, admin_password).await {
            Ok(session) => session,
            Err(err) => return GateOutcome::Unavailable(err),
        };

        for group in self.groups {
            debug!("group found: {group}");
            match directory.is_member(&session, username, group).await {
                Ok(true) => {
                    debug!(r#"user "{username}" is a member of group "{group}""#);
                    return GateOutcome::Allowed;
                }
                Ok(false) => {}
                Err(DirectoryError::AuthorizationDenied) => {
                    error!("admin user has insufficient privileges to query group membership");
                    return GateOutcome::AdminDenied;
                }
                Err(err) => return GateOutcome::Unavailable(err),
            }
        }

        info!(
            r#"user "{username}" is not a member of any of: {}"#,
            self.groups.join(", ")
        );
        GateOutcome::NotMember
    }
}
