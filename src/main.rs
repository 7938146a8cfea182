use anyhow::Context;
use clap::Parser;
use kastia::adapter::inbound::cli::{self, command::Cli};
use kastia::infrastructure::config::settings::Config;
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let config = Config::load_or_default(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    config.init_logging();

    if let Err(e) = cli::dispatch(args, config).await {
        error!(error = %e, "Command failed");
        return Err(e.into());
    }
    Ok(())
}
