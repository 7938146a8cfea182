//! Groups, their membership, access requests and market links.
//!
//! Access requests move `PENDING → APPROVED` or `PENDING → DENIED`; both
//! targets are terminal. Membership is stored in join tables, the owner is
//! never stored as a member and is counted implicitly.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{AccessRequestId, GroupId, MarketId, UserId};
use super::market::MarketStatus;

const MAX_NAME_LEN: usize = 255;

/// Group visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privacy {
    #[default]
    Public,
    Invite,
}

impl Privacy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Invite => "INVITE",
        }
    }
}

impl FromStr for Privacy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLIC" => Ok(Self::Public),
            "INVITE" => Ok(Self::Invite),
            other => Err(DomainError::unknown("privacy", other)),
        }
    }
}

/// Access request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessRequestStatus {
    Pending,
    Approved,
    Denied,
}

impl AccessRequestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for AccessRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessRequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "DENIED" => Ok(Self::Denied),
            other => Err(DomainError::unknown("access request status", other)),
        }
    }
}

/// Decision taken on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Approve,
    Deny,
}

impl AccessDecision {
    #[must_use]
    pub const fn target_status(self) -> AccessRequestStatus {
        match self {
            Self::Approve => AccessRequestStatus::Approved,
            Self::Deny => AccessRequestStatus::Denied,
        }
    }
}

/// A persisted group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub privacy: Privacy,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    #[must_use]
    pub fn audit_target(&self) -> String {
        format!("Group: {}", self.name)
    }
}

/// Owner, admin set and member set of a group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Roster {
    pub owner: Option<UserId>,
    pub admins: BTreeSet<UserId>,
    pub members: BTreeSet<UserId>,
}

impl Roster {
    #[must_use]
    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }

    /// Owner or explicit member.
    #[must_use]
    pub fn is_member(&self, user: UserId) -> bool {
        self.is_owner(user) || self.members.contains(&user)
    }

    /// Owner or explicit admin; these may manage requests and markets.
    #[must_use]
    pub fn is_admin(&self, user: UserId) -> bool {
        self.is_owner(user) || self.admins.contains(&user)
    }

    /// Members plus the owner, counting the owner once.
    #[must_use]
    pub fn member_count(&self) -> usize {
        let explicit = self
            .members
            .iter()
            .filter(|m| Some(**m) != self.owner)
            .count();
        explicit + usize::from(self.owner.is_some())
    }
}

/// Basic user info for nested listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// A persisted access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRequest {
    pub id: AccessRequestId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub username: String,
    pub status: AccessRequestStatus,
    pub message: String,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<UserId>,
}

/// A market linked to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMarket {
    pub group_id: GroupId,
    pub market_id: MarketId,
    pub market_title: String,
    pub market_status: MarketStatus,
    pub created_at: DateTime<Utc>,
}

/// Group with everything a detail view needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDetail {
    pub group: Group,
    pub owner: MemberInfo,
    pub admins: Vec<MemberInfo>,
    pub members: Vec<MemberInfo>,
    pub markets: Vec<GroupMarket>,
    pub roster: Roster,
}

/// Validated request to create a group.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub category: String,
    pub privacy: Privacy,
}

impl NewGroup {
    /// Validate a group creation request.
    ///
    /// # Errors
    /// Returns [`DomainError`] for a blank or overlong name.
    pub fn try_new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        privacy: Privacy,
    ) -> Result<Self, DomainError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::MissingField { field: "name" });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }
        let category = category.into().trim().to_string();
        Ok(Self {
            name,
            description: description.into(),
            category: if category.is_empty() {
                "General".to_string()
            } else {
                category
            },
            privacy,
        })
    }
}
