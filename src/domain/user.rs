//! Users and their profiles.
//!
//! A [`User`] is an identity with credentials; its [`Profile`] carries the
//! balance, role, tier and ban state. The two are always created together:
//! [`NewUser`] is the only way to ask the store for a user, and the store
//! writes the profile in the same transaction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::UserId;

const MAX_USERNAME_LEN: usize = 150;

/// Profile role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "USER" => Ok(Self::User),
            other => Err(DomainError::unknown("role", other)),
        }
    }
}

/// Account tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    #[default]
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "TIER_3")]
    Tier3,
}

impl Tier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tier1 => "TIER_1",
            Self::Tier2 => "TIER_2",
            Self::Tier3 => "TIER_3",
        }
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TIER_1" => Ok(Self::Tier1),
            "TIER_2" => Ok(Self::Tier2),
            "TIER_3" => Ok(Self::Tier3),
            other => Err(DomainError::unknown("tier", other)),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// Ban state carried on a profile.
///
/// `Banned` keeps every field the unban operation must clear, so an unbanned
/// profile is exactly `BanState::Active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BanState {
    Active,
    Banned {
        reason: Option<String>,
        banned_at: DateTime<Utc>,
        banned_by: Option<UserId>,
    },
}

impl BanState {
    #[must_use]
    pub const fn is_banned(&self) -> bool {
        matches!(self, Self::Banned { .. })
    }

    /// Reason recorded with the ban, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Banned { reason, .. } => reason.as_deref(),
            Self::Active => None,
        }
    }
}

/// Per-user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub user_id: UserId,
    pub bio: Option<String>,
    pub balance: Decimal,
    pub currency: String,
    pub role: Role,
    pub tier: Tier,
    pub avatar_url: Option<String>,
    pub joined_date: NaiveDate,
    pub ban: BanState,
}

impl Profile {
    #[must_use]
    pub const fn is_banned(&self) -> bool {
        self.ban.is_banned()
    }
}

/// A user together with the profile it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    #[serde(flatten)]
    pub user: User,
    pub profile: Profile,
}

/// Validated request to create a user and its profile.
#[derive(Debug, Clone)]
pub struct NewUser {
    username: String,
    email: String,
    password_hash: String,
    is_superuser: bool,
    is_staff: bool,
}

impl NewUser {
    /// Validate the identity fields of a new user.
    ///
    /// # Errors
    /// Returns [`DomainError`] when the username is blank, too long or contains
    /// whitespace, or when the email has no `@`.
    pub fn try_new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let username = username.into().trim().to_string();
        let email = email.into().trim().to_string();

        if username.is_empty() {
            return Err(DomainError::MissingField { field: "username" });
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::TooLong {
                field: "username",
                max: MAX_USERNAME_LEN,
            });
        }
        if username.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidValue {
                field: "username",
                reason: "must not contain whitespace".into(),
            });
        }
        if !email.is_empty() && !email.contains('@') {
            return Err(DomainError::InvalidValue {
                field: "email",
                reason: "must contain '@'".into(),
            });
        }

        Ok(Self {
            username,
            email,
            password_hash: password_hash.into(),
            is_superuser: false,
            is_staff: false,
        })
    }

    /// Mark the user as a superuser (implies staff).
    #[must_use]
    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self.is_staff = true;
        self
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub const fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.is_staff
    }
}

/// Username derived from an external identity's email address.
#[must_use]
pub fn username_from_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
