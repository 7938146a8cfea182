//! Audit trail entries.
//!
//! Every privileged mutation appends exactly one [`NewAuditEntry`] inside the
//! transaction that performs it. Entries are never updated or deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::error::DomainError;
use super::id::{AuditLogId, UserId};

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateMarket,
    ResolveMarket,
    CancelMarket,
    SeedLiquidity,
    HaltTrading,
    CancelOrder,
    ViewSensitive,
    BanUser,
    UnbanUser,
    CreateGroup,
    RequestAccess,
    ApproveAccess,
    DenyAccess,
    AddGroupMarket,
    RemoveGroupMarket,
    AddGroupAdmin,
    Other,
}

impl AuditAction {
    pub const ALL: [AuditAction; 17] = [
        Self::CreateMarket,
        Self::ResolveMarket,
        Self::CancelMarket,
        Self::SeedLiquidity,
        Self::HaltTrading,
        Self::CancelOrder,
        Self::ViewSensitive,
        Self::BanUser,
        Self::UnbanUser,
        Self::CreateGroup,
        Self::RequestAccess,
        Self::ApproveAccess,
        Self::DenyAccess,
        Self::AddGroupMarket,
        Self::RemoveGroupMarket,
        Self::AddGroupAdmin,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateMarket => "CREATE_MARKET",
            Self::ResolveMarket => "RESOLVE_MARKET",
            Self::CancelMarket => "CANCEL_MARKET",
            Self::SeedLiquidity => "SEED_LIQUIDITY",
            Self::HaltTrading => "HALT_TRADING",
            Self::CancelOrder => "CANCEL_ORDER",
            Self::ViewSensitive => "VIEW_SENSITIVE",
            Self::BanUser => "BAN_USER",
            Self::UnbanUser => "UNBAN_USER",
            Self::CreateGroup => "CREATE_GROUP",
            Self::RequestAccess => "REQUEST_ACCESS",
            Self::ApproveAccess => "APPROVE_ACCESS",
            Self::DenyAccess => "DENY_ACCESS",
            Self::AddGroupMarket => "ADD_GROUP_MARKET",
            Self::RemoveGroupMarket => "REMOVE_GROUP_MARKET",
            Self::AddGroupAdmin => "ADD_GROUP_ADMIN",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DomainError::unknown("action", s))
    }
}

/// Entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub action: AuditAction,
    pub target: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

impl NewAuditEntry {
    /// Entry attributed to `actor`, carrying the request origin.
    pub fn by(actor: &Actor, action: AuditAction, target: impl Into<String>) -> Self {
        Self {
            user_id: actor.user_id,
            action,
            target: target.into(),
            details: None,
            ip_address: actor.ip_address.clone(),
        }
    }

    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: AuditLogId,
    pub user_id: UserId,
    pub username: String,
    pub action: AuditAction,
    pub target: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Audit listing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub user_id: Option<UserId>,
    pub limit: Option<i64>,
}
