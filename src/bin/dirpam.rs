use anyhow::Result;
use dirpam::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let code = action.execute().await?;

    std::process::exit(code)
}
