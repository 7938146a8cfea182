//! Storage- and transport-agnostic domain types.
//!
//! Everything here is plain data plus the invariants that can be checked
//! without touching the database: lifecycle states, validated creation
//! requests, position arithmetic.

pub mod actor;
pub mod audit;
pub mod error;
pub mod group;
pub mod id;
pub mod market;
pub mod position;
pub mod trade;
pub mod user;

pub use actor::{Actor, Permission, ADMIN_ROLE_GROUP};
pub use audit::{AuditAction, AuditEntry, AuditFilter, NewAuditEntry};
pub use error::DomainError;
pub use group::{
    AccessDecision, AccessRequest, AccessRequestStatus, Group, GroupDetail, GroupMarket,
    MemberInfo, NewGroup, Privacy, Roster,
};
pub use id::{
    AccessRequestId, AuditLogId, GroupId, MarketId, OutcomeId, PositionId, TradeId, UserId,
};
pub use market::{
    Market, MarketCategory, MarketFilter, MarketState, MarketStatus, NewMarket, NewOutcome,
    Outcome,
};
pub use position::{Holding, Position, PositionKey, Side};
pub use trade::{Trade, TradeOrder, TradeStatus};
pub use user::{Account, BanState, NewUser, Profile, Role, Tier, User};
