//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe storage and credential dependencies.

pub mod identity;
pub mod store;

pub use identity::{ExternalTokenVerifier, PasswordHasher};
pub use store::{
    AccountStore, AuditStore, Credentials, ExternalIdentity, GroupStore, LedgerStore,
    MarketStore, MarketTransition,
};
