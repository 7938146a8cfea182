//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Prediction market backend
#[derive(Parser, Debug)]
#[command(name = "kastia")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Apply pending database migrations
    Migrate,

    /// Create the superuser account if it does not exist
    CreateAdmin(CreateAdminArgs),

    /// Create the standard role groups and their permissions
    SetupRoles,

    /// Add a user to a role group
    GrantRole(GrantRoleArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override `server.bind` from the config file
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    #[arg(long, default_value = "admin")]
    pub username: String,

    #[arg(long, default_value = "admin@kastia.com")]
    pub email: String,

    /// Password for the new account
    #[arg(long, env = "KASTIA_ADMIN_PASSWORD")]
    pub password: String,
}

#[derive(Args, Debug)]
pub struct GrantRoleArgs {
    /// Username to grant the role to
    pub username: String,

    /// Role group name, e.g. "Market Operations"
    pub role: String,
}
