use crate::cli::actions::{add_users, check, Action};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<i32> {
    match action {
        Action::Check(args) => check::execute(args).await,
        Action::AddUsers(args) => add_users::execute(args).await,
    }
}
