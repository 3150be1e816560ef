//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the appropriate action.

use crate::cli::actions::{add_users, check, Action};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config_file = matches
        .get_one::<String>("config-file")
        .map(PathBuf::from)
        .context("missing required argument: --config-file")?;

    match matches.subcommand() {
        Some(("check", sub)) => Ok(Action::Check(check::Args {
            config_file,
            username: sub
                .get_one::<String>("username")
                .cloned()
                .context("missing required argument: username")?,
        })),
        Some(("add-users", sub)) => Ok(Action::AddUsers(add_users::Args {
            config_file,
            group: sub.get_one::<String>("group").cloned(),
            admin_group: sub.get_one::<String>("admin-group").cloned(),
            exclude: sub
                .get_many::<String>("exclude")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            command: sub
                .get_one::<String>("command")
                .cloned()
                .context("missing required argument: --command")?,
            dry_run: sub.get_flag("dry-run"),
        })),
        _ => Err(anyhow!("no subcommand provided")),
    }
}
