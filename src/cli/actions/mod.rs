pub mod add_users;
pub mod check;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

#[derive(Debug)]
pub enum Action {
    Check(check::Args),
    AddUsers(add_users::Args),
}

impl Action {
    /// Execute the action and return the process exit code.
    ///
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<i32> {
        run::execute(self).await
    }
}
