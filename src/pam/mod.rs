//! Host plugin adapter.
//!
//! A PAM-style host invokes fixed entry points per login attempt and speaks
//! its own status-code vocabulary. This module is the narrow layer between
//! that convention and the decision engine: each entry point is a thin call
//! that translates a [`Decision`] into a [`PamStatus`]. Session-lifecycle
//! operations the engine does not implement answer with an explicit
//! service-error status instead of attempting them.

use crate::auth::{AuthDecisionEngine, Decision};
use crate::directory::DirectoryService;
use anyhow::Result;
use secrecy::SecretString;
use tracing::{debug, info};

/// Host status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PamStatus {
    Success,
    ServiceErr,
    AuthErr,
    Ignore,
}

impl PamStatus {
    /// Numeric code as expected by the host runtime.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ServiceErr => 3,
            Self::AuthErr => 9,
            Self::Ignore => 25,
        }
    }
}

impl From<Decision> for PamStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Success => Self::Success,
            Decision::Ignored => Self::Ignore,
            // An unexpected collaborator failure is logged with full detail
            // but surfaced as a plain rejection, never as success.
            Decision::Rejected | Decision::ServiceError => Self::AuthErr,
        }
    }
}

/// Conversation primitive supplied by the host.
pub trait Conversation {
    /// Prompt the user for a secret with echo disabled.
    ///
    /// # Errors
    /// Returns an error if the conversation with the user fails.
    fn prompt_hidden(&mut self, prompt: &str) -> Result<SecretString>;
}

/// One login attempt as presented by the host.
pub struct LoginAttempt<C> {
    pub username: String,
    /// Credential already collected by an earlier module in the host stack.
    pub authtok: Option<SecretString>,
    pub conversation: C,
}

/// `authenticate` entry point.
pub async fn sm_authenticate<D, C>(
    engine: &AuthDecisionEngine<D>,
    attempt: &mut LoginAttempt<C>,
) -> PamStatus
where
    D: DirectoryService,
    C: Conversation,
{
    let prompt = format!("{} ", engine.prompt());
    let LoginAttempt {
        username,
        authtok,
        conversation,
    } = attempt;
    let authtok = authtok.take();

    let decision = engine
        .decide(username, move || {
            if let Some(token) = authtok {
                return Ok(token);
            }
            debug!("no auth token was found; starting conversation");
            conversation.prompt_hidden(&prompt)
        })
        .await;

    PamStatus::from(decision)
}

/// `setcred` entry point. Always succeeds; the host calls it upon
/// authentication success.
#[must_use]
pub fn sm_setcred() -> PamStatus {
    PamStatus::Success
}

/// `acct_mgmt` entry point.
#[must_use]
pub fn sm_acct_mgmt() -> PamStatus {
    unsupported("acct_mgmt")
}

/// `chauthtok` entry point.
#[must_use]
pub fn sm_chauthtok() -> PamStatus {
    unsupported("chauthtok")
}

/// `open_session` entry point.
#[must_use]
pub fn sm_open_session() -> PamStatus {
    unsupported("open_session")
}

/// `close_session` entry point.
#[must_use]
pub fn sm_close_session() -> PamStatus {
    unsupported("close_session")
}

fn unsupported(operation: &str) -> PamStatus {
    info!("`{operation}` is not supported.");
    PamStatus::ServiceErr
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, CacheSettings};
    use crate::directory::{AdminSession, DirectoryError, DirectoryUser, LoginOutcome};
    use secrecy::ExposeSecret;

    struct FakeDirectory;

    impl DirectoryService for FakeDirectory {
        async fn login_as_admin(
            &self,
            _identity: &str,
            _credential: &SecretString,
        ) -> Result<AdminSession, DirectoryError> {
            Ok(AdminSession::new(SecretString::from("tok-1".to_string())))
        }

        async fn login(
            &self,
            identity: &str,
            credential: &SecretString,
        ) -> Result<LoginOutcome, DirectoryError> {
            if identity == "user1@example.com" && credential.expose_secret() == "good-pwd" {
                Ok(LoginOutcome::Success)
            } else {
                Ok(LoginOutcome::BadCredential)
            }
        }

        async fn is_member(
            &self,
            _session: &AdminSession,
            _username: &str,
            _group: &str,
        ) -> Result<bool, DirectoryError> {
            Ok(true)
        }

        async fn list_members(
            &self,
            _session: &AdminSession,
            _group: &str,
        ) -> Result<Vec<String>, DirectoryError> {
            Ok(Vec::new())
        }

        async fn fetch_user(
            &self,
            _session: &AdminSession,
            username: &str,
        ) -> Result<DirectoryUser, DirectoryError> {
            Err(DirectoryError::InvalidResponse(username.to_string()))
        }
    }

    struct RecordingConversation {
        response: &'static str,
        prompts: Vec<String>,
    }

    impl Conversation for RecordingConversation {
        fn prompt_hidden(&mut self, prompt: &str) -> Result<SecretString> {
            self.prompts.push(prompt.to_string());
            Ok(SecretString::from(self.response.to_string()))
        }
    }

    fn engine() -> AuthDecisionEngine<FakeDirectory> {
        let config = AuthConfig {
            url: None,
            domain: Some("example.com".to_string()),
            admin_username: Some("admin".to_string()),
            admin_password: Some(SecretString::from("good-pwd".to_string())),
            groups: Vec::new(),
            excludes: vec!["root".to_string()],
            prompt: "Password:".to_string(),
            cache: CacheSettings::None,
        };
        AuthDecisionEngine::new(config, FakeDirectory)
    }

    #[test]
    fn status_codes_match_the_host_vocabulary() {
        assert_eq!(PamStatus::Success.code(), 0);
        assert_eq!(PamStatus::ServiceErr.code(), 3);
        assert_eq!(PamStatus::AuthErr.code(), 9);
        assert_eq!(PamStatus::Ignore.code(), 25);
    }

    #[test]
    fn decisions_translate_to_statuses() {
        assert_eq!(PamStatus::from(Decision::Success), PamStatus::Success);
        assert_eq!(PamStatus::from(Decision::Ignored), PamStatus::Ignore);
        assert_eq!(PamStatus::from(Decision::Rejected), PamStatus::AuthErr);
        assert_eq!(PamStatus::from(Decision::ServiceError), PamStatus::AuthErr);
    }

    #[test]
    fn lifecycle_operations_answer_unsupported() {
        assert_eq!(sm_setcred(), PamStatus::Success);
        assert_eq!(sm_acct_mgmt(), PamStatus::ServiceErr);
        assert_eq!(sm_chauthtok(), PamStatus::ServiceErr);
        assert_eq!(sm_open_session(), PamStatus::ServiceErr);
        assert_eq!(sm_close_session(), PamStatus::ServiceErr);
    }

    #[tokio::test]
    async fn conversation_runs_with_the_configured_prompt() {
        let engine = engine();
        let mut attempt = LoginAttempt {
            username: "user1".to_string(),
            authtok: None,
            conversation: RecordingConversation {
                response: "good-pwd",
                prompts: Vec::new(),
            },
        };

        let status = sm_authenticate(&engine, &mut attempt).await;
        assert_eq!(status, PamStatus::Success);
        assert_eq!(attempt.conversation.prompts, vec!["Password: ".to_string()]);
    }

    #[tokio::test]
    async fn collected_authtok_skips_the_conversation() {
        let engine = engine();
        let mut attempt = LoginAttempt {
            username: "user1".to_string(),
            authtok: Some(SecretString::from("good-pwd".to_string())),
            conversation: RecordingConversation {
                response: "unused",
                prompts: Vec::new(),
            },
        };

        let status = sm_authenticate(&engine, &mut attempt).await;
        assert_eq!(status, PamStatus::Success);
        assert!(attempt.conversation.prompts.is_empty());
    }

    #[tokio::test]
    async fn excluded_user_never_reaches_the_conversation() {
        let engine = engine();
        let mut attempt = LoginAttempt {
            username: "root".to_string(),
            authtok: None,
            conversation: RecordingConversation {
                response: "unused",
                prompts: Vec::new(),
            },
        };

        let status = sm_authenticate(&engine, &mut attempt).await;
        assert_eq!(status, PamStatus::Ignore);
        assert!(attempt.conversation.prompts.is_empty());
    }

    #[tokio::test]
    async fn bad_credential_maps_to_auth_error() {
        let engine = engine();
        let mut attempt = LoginAttempt {
            username: "user1".to_string(),
            authtok: Some(SecretString::from("bad-pwd".to_string())),
            conversation: RecordingConversation {
                response: "unused",
                prompts: Vec::new(),
            },
        };

        let status = sm_authenticate(&engine, &mut attempt).await;
        assert_eq!(status, PamStatus::AuthErr);
    }
}
