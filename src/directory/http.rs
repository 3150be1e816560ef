//! HTTP implementation of the directory collaborator.
//!
//! Admin credentials are exchanged for a short-lived token which
//! authenticates the membership and provisioning lookups. Each call builds
//! its own client; the engine performs one synchronous pipeline per login
//! attempt, so nothing is pooled across invocations.

use super::{AdminSession, DirectoryError, DirectoryService, DirectoryUser, LoginOutcome};
use crate::APP_USER_AGENT;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

const TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    base_url: String,
}

impl HttpDirectoryClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn client() -> Result<Client, DirectoryError> {
        Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))
    }

    fn endpoint(&self, path: &str) -> Result<String, DirectoryError> {
        let url = Url::parse(&self.base_url)
            .map_err(|err| DirectoryError::InvalidResponse(format!("invalid base URL: {err}")))?;

        let scheme = url.scheme();

        let host = url
            .host()
            .ok_or_else(|| DirectoryError::InvalidResponse("no host in base URL".to_string()))?
            .to_owned();

        let port = match url.port() {
            Some(p) => p,
            None => match scheme {
                "http" => 80,
                "https" => 443,
                _ => {
                    return Err(DirectoryError::InvalidResponse(format!(
                        "unsupported scheme {scheme}"
                    )))
                }
            },
        };

        debug!("endpoint: {}", path);

        Ok(format!("{scheme}://{host}:{port}{path}"))
    }
}

impl DirectoryService for HttpDirectoryClient {
    #[instrument(skip(self, credential))]
    async fn login_as_admin(
        &self,
        identity: &str,
        credential: &SecretString,
    ) -> Result<AdminSession, DirectoryError> {
        let url = self.endpoint("/v1/session/admin")?;

        let response = Self::client()?
            .post(&url)
            .json(&json!({
                "identity": identity,
                "credential": credential.expose_secret(),
            }))
            .send()
            .await
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::Unauthorized);
        }
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!("{url} - {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))?;
        let token = body["token"]
            .as_str()
            .ok_or_else(|| DirectoryError::InvalidResponse("no token in response".to_string()))?;

        Ok(AdminSession::new(SecretString::from(token.to_string())))
    }

    #[instrument(skip(self, credential))]
    async fn login(
        &self,
        identity: &str,
        credential: &SecretString,
    ) -> Result<LoginOutcome, DirectoryError> {
        let url = self.endpoint("/v1/session/verify")?;

        let response = Self::client()?
            .post(&url)
            .json(&json!({
                "identity": identity,
                "credential": credential.expose_secret(),
            }))
            .send()
            .await
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(LoginOutcome::Success);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Ok(LoginOutcome::BadCredential);
        }
        if status == StatusCode::PRECONDITION_REQUIRED {
            return Ok(LoginOutcome::ChallengeRequired);
        }

        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Unavailable(format!(
            "{url} - {status}, {body}"
        )))
    }

    #[instrument(skip(self, session))]
    async fn is_member(
        &self,
        session: &AdminSession,
        username: &str,
        group: &str,
    ) -> Result<bool, DirectoryError> {
        let url = self.endpoint(&format!("/v1/groups/{group}/members/{username}"))?;

        let response = Self::client()?
            .get(&url)
            .header(TOKEN_HEADER, session.token().expose_secret())
            .send()
            .await
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::AuthorizationDenied);
        }
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!("{url} - {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))?;
        body["member"]
            .as_bool()
            .ok_or_else(|| DirectoryError::InvalidResponse("no member flag in response".to_string()))
    }

    #[instrument(skip(self, session))]
    async fn list_members(
        &self,
        session: &AdminSession,
        group: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let url = self.endpoint(&format!("/v1/groups/{group}/members"))?;

        let response = Self::client()?
            .get(&url)
            .header(TOKEN_HEADER, session.token().expose_secret())
            .send()
            .await
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::AuthorizationDenied);
        }
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!("{url} - {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))?;
        let members = body["members"].as_array().ok_or_else(|| {
            DirectoryError::InvalidResponse("no members list in response".to_string())
        })?;

        Ok(members
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    #[instrument(skip(self, session))]
    async fn fetch_user(
        &self,
        session: &AdminSession,
        username: &str,
    ) -> Result<DirectoryUser, DirectoryError> {
        let url = self.endpoint(&format!("/v1/users/{username}"))?;

        let response = Self::client()?
            .get(&url)
            .header(TOKEN_HEADER, session.token().expose_secret())
            .send()
            .await
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(DirectoryError::AuthorizationDenied);
        }
        if !status.is_success() {
            return Err(DirectoryError::Unavailable(format!("{url} - {status}")));
        }

        response
            .json()
            .await
            .map_err(|err| DirectoryError::InvalidResponse(err.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn admin_login_returns_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/session/admin"))
            .and(body_json(json!({
                "identity": "admin@example.com",
                "credential": "good-pwd",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        let session = client
            .login_as_admin("admin@example.com", &SecretString::from("good-pwd".to_string()))
            .await
            .unwrap();
        assert_eq!(session.token().expose_secret(), "tok-1");
    }

    #[tokio::test]
    async fn admin_login_rejects_bad_credentials() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/session/admin"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        let result = client
            .login_as_admin("admin@example.com", &SecretString::from("bad".to_string()))
            .await;
        assert!(matches!(result, Err(DirectoryError::Unauthorized)));
    }

    #[tokio::test]
    async fn login_maps_status_to_outcome() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/session/verify"))
            .and(body_json(json!({
                "identity": "user1@example.com",
                "credential": "good-pwd",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/session/verify"))
            .and(body_json(json!({
                "identity": "user1@example.com",
                "credential": "bad-pwd",
            })))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/session/verify"))
            .and(body_json(json!({
                "identity": "user3@example.com",
                "credential": "good-pwd",
            })))
            .respond_with(ResponseTemplate::new(428))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        assert_eq!(
            client
                .login("user1@example.com", &SecretString::from("good-pwd".to_string()))
                .await
                .unwrap(),
            LoginOutcome::Success
        );
        assert_eq!(
            client
                .login("user1@example.com", &SecretString::from("bad-pwd".to_string()))
                .await
                .unwrap(),
            LoginOutcome::BadCredential
        );
        assert_eq!(
            client
                .login("user3@example.com", &SecretString::from("good-pwd".to_string()))
                .await
                .unwrap(),
            LoginOutcome::ChallengeRequired
        );
    }

    #[tokio::test]
    async fn login_surfaces_unexpected_failures() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/session/verify"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        let result = client
            .login("error@example.com", &SecretString::from("pwd".to_string()))
            .await;
        assert!(matches!(result, Err(DirectoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn is_member_reads_flag_and_authenticates() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/groups/group1/members/user1"))
            .and(header(TOKEN_HEADER, "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"member": true})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/groups/group1/members/user2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        let session = AdminSession::new(SecretString::from("tok-1".to_string()));
        assert!(client.is_member(&session, "user1", "group1").await.unwrap());
        assert!(!client.is_member(&session, "user2", "group1").await.unwrap());
    }

    #[tokio::test]
    async fn is_member_fails_closed_without_privilege() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/groups/group1/members/notallowed"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        let session = AdminSession::new(SecretString::from("tok-1".to_string()));
        let result = client.is_member(&session, "notallowed", "group1").await;
        assert!(matches!(result, Err(DirectoryError::AuthorizationDenied)));
    }

    #[tokio::test]
    async fn list_members_and_fetch_user() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/groups/staff/members"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "members": ["user1@example.com", "user2@example.com"],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "user1",
                "given_name": "User",
                "family_name": "One",
            })))
            .mount(&server)
            .await;

        let client = HttpDirectoryClient::new(server.uri());
        let session = AdminSession::new(SecretString::from("tok-1".to_string()));
        let members = client.list_members(&session, "staff").await.unwrap();
        assert_eq!(members, vec!["user1@example.com", "user2@example.com"]);

        let user = client.fetch_user(&session, "user1").await.unwrap();
        assert_eq!(user.full_name(), "User One");
    }
}
