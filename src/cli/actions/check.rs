//! Run one authentication decision from the terminal.
//!
//! Operator tooling: exercises the exact pipeline the host adapter runs,
//! and exits with the host status code the decision maps to.

use crate::auth::AuthDecisionEngine;
use crate::config::AuthConfig;
use crate::directory::http::HttpDirectoryClient;
use crate::pam::{self, Conversation, LoginAttempt, PamStatus};
use anyhow::Result;
use secrecy::SecretString;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub config_file: PathBuf,
    pub username: String,
}

/// Handle the check action
///
/// # Errors
/// Returns an error if the configuration cannot be loaded.
pub async fn execute(args: Args) -> Result<i32> {
    let config = AuthConfig::load(&args.config_file)?;

    let Some(url) = config.url.clone() else {
        info!("no directory service URL configured");
        return Ok(PamStatus::Ignore.code());
    };

    let engine = AuthDecisionEngine::new(config, HttpDirectoryClient::new(url));
    let mut attempt = LoginAttempt {
        username: args.username,
        authtok: None,
        conversation: TerminalConversation,
    };

    let status = pam::sm_authenticate(&engine, &mut attempt).await;
    info!("decision for {}: {status:?}", attempt.username);

    Ok(status.code())
}

/// Reads the credential from the terminal. Operator convenience only; the
/// echo stays on.
struct TerminalConversation;

impl Conversation for TerminalConversation {
    fn prompt_hidden(&mut self, prompt: &str) -> Result<SecretString> {
        let mut stdout = std::io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(SecretString::from(
            line.trim_end_matches(['\r', '\n']).to_string(),
        ))
    }
}
