//! SQLite persistence adapters.
//!
//! Provides SQLite-backed implementations of the store ports using Diesel ORM.
//! Every store shares one connection pool.

pub mod account;
pub mod audit;
pub mod database;
pub mod group;
pub mod ledger;
pub mod market;

pub use account::SqliteAccountStore;
pub use audit::SqliteAuditStore;
pub use group::SqliteGroupStore;
pub use ledger::SqliteLedgerStore;
pub use market::SqliteMarketStore;
