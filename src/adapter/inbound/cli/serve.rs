//! Handler for the `serve` command.

use tokio::signal;
use tracing::info;

use crate::adapter::inbound::cli::command::ServeArgs;
use crate::adapter::inbound::http;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Open the database, wire services and serve until Ctrl-C.
pub async fn execute(mut config: Config, args: &ServeArgs) -> Result<()> {
    if let Some(bind) = &args.bind {
        config.server.bind.clone_from(bind);
    }
    let addr = config.bind_addr()?;
    let (_pool, services) = bootstrap::build(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "kastia starting");
    http::serve(addr, services, async {
        let _ = signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await
}
