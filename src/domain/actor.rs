//! The normalized identity every authorization check runs against.
//!
//! Whichever way a caller authenticated (local opaque token, password login or
//! an externally signed token), the inbound adapter resolves it to an
//! [`Actor`] built from the same tables. Authorization never looks at how the
//! actor arrived.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{GroupId, UserId};

/// Name of the role group that confers administrator status.
pub const ADMIN_ROLE_GROUP: &str = "Admin";

/// Grantable capability codenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AddMarket,
    ChangeMarket,
    DeleteMarket,
    ViewMarket,
    #[serde(rename = "can_seed_liquidity")]
    SeedLiquidity,
    #[serde(rename = "can_resolve_market")]
    ResolveMarket,
    #[serde(rename = "can_halt_trading")]
    HaltTrading,
    #[serde(rename = "can_ban_user")]
    BanUser,
    #[serde(rename = "view_auditlog")]
    ViewAuditLog,
    ViewUser,
}

impl Permission {
    /// All known permissions.
    pub const ALL: [Permission; 10] = [
        Self::AddMarket,
        Self::ChangeMarket,
        Self::DeleteMarket,
        Self::ViewMarket,
        Self::SeedLiquidity,
        Self::ResolveMarket,
        Self::HaltTrading,
        Self::BanUser,
        Self::ViewAuditLog,
        Self::ViewUser,
    ];

    /// Codename stored in the permission tables.
    #[must_use]
    pub const fn codename(self) -> &'static str {
        match self {
            Self::AddMarket => "add_market",
            Self::ChangeMarket => "change_market",
            Self::DeleteMarket => "delete_market",
            Self::ViewMarket => "view_market",
            Self::SeedLiquidity => "can_seed_liquidity",
            Self::ResolveMarket => "can_resolve_market",
            Self::HaltTrading => "can_halt_trading",
            Self::BanUser => "can_ban_user",
            Self::ViewAuditLog => "view_auditlog",
            Self::ViewUser => "view_user",
        }
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.codename() == s)
            .ok_or_else(|| DomainError::unknown("permission", s))
    }
}

/// Built-in role groups and the permissions each one grants.
#[must_use]
pub fn default_role_groups() -> Vec<(&'static str, Vec<Permission>)> {
    vec![
        (
            "Market Operations",
            vec![
                Permission::AddMarket,
                Permission::ChangeMarket,
                Permission::DeleteMarket,
                Permission::SeedLiquidity,
                Permission::ResolveMarket,
            ],
        ),
        (
            "Compliance",
            vec![
                Permission::HaltTrading,
                Permission::ViewMarket,
                Permission::ViewAuditLog,
                Permission::BanUser,
            ],
        ),
        ("Customer Support", vec![Permission::ViewUser]),
        (ADMIN_ROLE_GROUP, Vec::new()),
        ("Editor", Vec::new()),
    ]
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: UserId,
    pub username: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_banned: bool,
    /// Role group names the user belongs to.
    pub roles: BTreeSet<String>,
    /// Union of explicit grants and role-group permissions.
    pub permissions: BTreeSet<Permission>,
    /// Groups the user owns, administers or belongs to.
    pub groups: BTreeSet<GroupId>,
    /// Network origin of the current request.
    #[serde(skip)]
    pub ip_address: Option<String>,
}

impl Actor {
    /// A plain actor with no roles, grants or memberships.
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_superuser: false,
            is_staff: false,
            is_banned: false,
            roles: BTreeSet::new(),
            permissions: BTreeSet::new(),
            groups: BTreeSet::new(),
            ip_address: None,
        }
    }

    /// True if the actor is in the named role group.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True if the actor holds the permission through any grant.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    #[must_use]
    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}
