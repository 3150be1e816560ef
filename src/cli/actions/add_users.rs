//! Bulk-provision local accounts from a directory group.

use crate::config::AuthConfig;
use crate::directory::http::HttpDirectoryClient;
use crate::provision::{self, ProvisionOptions};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug)]
pub struct Args {
    pub config_file: PathBuf,
    /// Directory group; falls back to the first configured required group.
    pub group: Option<String>,
    pub admin_group: Option<String>,
    pub exclude: Vec<String>,
    pub command: String,
    pub dry_run: bool,
}

/// Handle the add-users action
///
/// # Errors
/// Returns an error if the configuration is incomplete or provisioning
/// fails.
pub async fn execute(args: Args) -> Result<i32> {
    let config = AuthConfig::load(&args.config_file)?;

    let url = config
        .url
        .clone()
        .context("please specify the directory service URL")?;
    let essentials = config
        .essentials()
        .context("please specify the domain and admin credentials")?;
    let group = args
        .group
        .or_else(|| config.groups.first().cloned())
        .context("please specify the directory group")?;

    let options = ProvisionOptions {
        group,
        admin_group: args.admin_group,
        exclude: args.exclude,
        command: args.command,
        dry_run: args.dry_run,
    };

    let directory = HttpDirectoryClient::new(url);
    provision::add_users(
        &directory,
        essentials.domain,
        essentials.admin_username,
        essentials.admin_password,
        &options,
    )
    .await?;

    Ok(0)
}
