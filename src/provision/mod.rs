//! Bulk user provisioning.
//!
//! Creates a local account for every member of a directory group: list the
//! group members, fetch each member's metadata, then run a templated system
//! command per user. Templates may reference `{full_name}`, `{username}`
//! and `{admin_group}`.

use crate::directory::{qualified_identity, DirectoryService, DirectoryUser};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Default account-creation command.
pub const DEFAULT_ADD_USER_COMMAND: &str =
    r#"adduser --firstuid 2000 --disabled-password --gecos "{full_name}" {username}"#;

const ADD_TO_GROUP_COMMAND: &str = "usermod -a -G {admin_group} {username}";

#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// Directory group whose members are provisioned.
    pub group: String,
    /// Local group each created user is added to, if any.
    pub admin_group: Option<String>,
    /// Usernames never provisioned.
    pub exclude: Vec<String>,
    /// Account-creation command template.
    pub command: String,
    /// Log the commands without executing them.
    pub dry_run: bool,
}

/// Provision a local account for every member of the configured group.
///
/// The account-creation command is allowed to exit with status 1 (the user
/// already exists); any other failure aborts the run.
///
/// # Errors
/// Returns an error if the directory cannot be consulted or a command
/// fails.
pub async fn add_users<D: DirectoryService>(
    directory: &D,
    domain: &str,
    admin_username: &str,
    admin_password: &SecretString,
    options: &ProvisionOptions,
) -> Result<()> {
    // 1. Get a full list of all users to be added.
    info!("getting members of group: {}", options.group);
    let admin_identity = qualified_identity(admin_username, domain);
    let session = directory
        .login_as_admin(&admin_identity, admin_password)
        .await?;
    let emails = directory.list_members(&session, &options.group).await?;
    info!(
        "found members: {}",
        emails
            .iter()
            .map(|email| local_part(email))
            .collect::<Vec<_>>()
            .join(", ")
    );

    // 2. Fetch the metadata associated with each user.
    let mut users = Vec::new();
    for email in &emails {
        let user = directory.fetch_user(&session, local_part(email)).await?;
        if options.exclude.contains(&user.username) {
            info!("skipping {} ({email})", user.username);
            continue;
        }
        debug!("found user data: {user:?}");
        users.push(user);
    }

    // 3. Create a new local account for each user.
    for user in &users {
        let command = render(&options.command, user, options.admin_group.as_deref());
        match run(&command, options.dry_run).await? {
            // Exit status 1: the user already exists.
            Some(0 | 1) => {}
            status => {
                return Err(anyhow!("command exited with status {status:?}: {command}"));
            }
        }
        if let Some(admin_group) = &options.admin_group {
            let command = render(ADD_TO_GROUP_COMMAND, user, Some(admin_group));
            if run(&command, options.dry_run).await? != Some(0) {
                return Err(anyhow!("command failed: {command}"));
            }
        }
    }

    Ok(())
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn render(template: &str, user: &DirectoryUser, admin_group: Option<&str>) -> String {
    template
        .replace("{full_name}", &user.full_name())
        .replace("{username}", &user.username)
        .replace("{admin_group}", admin_group.unwrap_or_default())
}

/// Run a shell command, returning its exit status code.
async fn run(command: &str, dry_run: bool) -> Result<Option<i32>> {
    debug!("starting: {command}");
    if dry_run {
        info!("dry run: {command}");
        return Ok(Some(0));
    }

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
        .with_context(|| format!("failed to spawn command: {command}"))?;

    if !output.status.success() {
        error!("an error occurred while running command: {command}");
        error!("error output:\n{}", String::from_utf8_lossy(&output.stderr));
    } else {
        debug!("result:\n{}", String::from_utf8_lossy(&output.stdout));
    }

    Ok(output.status.code())
}
