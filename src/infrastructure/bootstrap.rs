//! Composition root: pool, stores and services wired from configuration.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::identity::{Argon2Hasher, HsJwtVerifier};
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations, DbPool};
use crate::adapter::outbound::sqlite::{
    SqliteAccountStore, SqliteAuditStore, SqliteGroupStore, SqliteLedgerStore, SqliteMarketStore,
};
use crate::application::{AccountService, AuditService, GroupService, LedgerService, MarketService};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::identity::PasswordHasher;

pub type Accounts = AccountService<SqliteAccountStore>;
pub type Markets = MarketService<SqliteMarketStore>;
pub type Ledger = LedgerService<SqliteLedgerStore, SqliteMarketStore>;
pub type Groups = GroupService<SqliteGroupStore, SqliteMarketStore>;
pub type Audit = AuditService<SqliteAuditStore>;

/// Every service the inbound adapters need.
#[derive(Clone)]
pub struct Services {
    pub accounts: Accounts,
    pub markets: Markets,
    pub ledger: Ledger,
    pub groups: Groups,
    pub audit: Audit,
}

impl Services {
    /// Wire services over an existing pool.
    #[must_use]
    pub fn new(pool: &DbPool, config: &Config, hasher: Arc<dyn PasswordHasher>) -> Self {
        let market_store = SqliteMarketStore::new(pool.clone());

        let mut accounts = AccountService::new(SqliteAccountStore::new(pool.clone()), hasher)
            .with_token_length(config.auth.token_length);
        if let Some(secret) = &config.auth.external_secret {
            accounts = accounts.with_external_verifier(Arc::new(HsJwtVerifier::new(
                secret.as_bytes(),
                config.auth.external_audience.clone(),
            )));
            info!(audience = %config.auth.external_audience, "External tokens enabled");
        }

        Self {
            accounts,
            markets: MarketService::new(market_store.clone()),
            ledger: LedgerService::new(SqliteLedgerStore::new(pool.clone()), market_store.clone()),
            groups: GroupService::new(SqliteGroupStore::new(pool.clone()), market_store),
            audit: AuditService::new(SqliteAuditStore::new(pool.clone())),
        }
    }
}

/// Open the database and apply pending migrations.
///
/// # Errors
/// Connection or migration failures.
pub fn open_database(config: &Config) -> Result<DbPool> {
    let pool = create_pool(&config.database.path, config.database.max_connections)?;
    run_migrations(&pool)?;
    info!(path = %config.database.path, "Database ready");
    Ok(pool)
}

/// Open the database and build services with the production hasher.
///
/// # Errors
/// Connection or migration failures.
pub fn build(config: &Config) -> Result<(DbPool, Services)> {
    let pool = open_database(config)?;
    let services = Services::new(&pool, config, Arc::new(Argon2Hasher::new()));
    Ok((pool, services))
}
