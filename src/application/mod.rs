//! Application services (use cases).
//!
//! Each service is generic over the outbound store ports it needs and routes
//! every permission question through [`authorization::AuthorizationEngine`].

pub mod account;
pub mod audit;
pub mod authorization;
pub mod group;
pub mod ledger;
pub mod market;

pub use account::{AccountService, Session};
pub use audit::AuditService;
pub use authorization::{Action, AuthorizationEngine, Resource};
pub use group::{DecisionOutcome, GroupService, GroupView};
pub use ledger::LedgerService;
pub use market::MarketService;
