//! CLI module graph.

pub mod command;
pub mod manage;
pub mod output;
pub mod serve;

use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use command::{Cli, Commands};

/// Run the parsed command against the loaded configuration.
pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    output::configure(cli.json);
    match &cli.command {
        Commands::Serve(args) => serve::execute(config, args).await,
        Commands::Migrate => manage::migrate(&config),
        Commands::CreateAdmin(args) => manage::create_admin(&config, args).await,
        Commands::SetupRoles => manage::setup_roles(&config).await,
        Commands::GrantRole(args) => manage::grant_role(&config, args).await,
    }
}
