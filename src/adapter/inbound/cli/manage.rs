//! Handlers for the maintenance commands.

use crate::adapter::inbound::cli::command::{CreateAdminArgs, GrantRoleArgs};
use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, Services};
use crate::infrastructure::config::settings::Config;

fn services(config: &Config) -> Result<Services> {
    let (_pool, services) = bootstrap::build(config)?;
    Ok(services)
}

/// Apply pending migrations.
pub fn migrate(config: &Config) -> Result<()> {
    bootstrap::open_database(config)?;
    output::success("Database is up to date");
    output::field("Path", &config.database.path);
    Ok(())
}

/// Create the superuser unless it already exists.
pub async fn create_admin(config: &Config, args: &CreateAdminArgs) -> Result<()> {
    let (account, created) = services(config)?
        .accounts
        .create_admin(&args.username, &args.email, &args.password)
        .await?;
    if created {
        output::success(&format!("Superuser \"{}\" created", account.user.username));
    } else {
        output::warning(&format!("Superuser \"{}\" already exists", account.user.username));
    }
    output::field("Username", &account.user.username);
    output::field("Email", &account.user.email);
    Ok(())
}

/// Seed the standard role groups.
pub async fn setup_roles(config: &Config) -> Result<()> {
    let names = services(config)?.accounts.setup_roles().await?;
    for name in &names {
        output::field("Role", name);
    }
    output::success(&format!("{} role groups ready", names.len()));
    Ok(())
}

/// Add a user to a role group.
pub async fn grant_role(config: &Config, args: &GrantRoleArgs) -> Result<()> {
    services(config)?
        .accounts
        .grant_role(&args.username, &args.role)
        .await?;
    output::success(&format!("Added {} to \"{}\"", args.username, args.role));
    Ok(())
}
