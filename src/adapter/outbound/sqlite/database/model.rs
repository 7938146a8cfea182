//! Database model types for Diesel ORM.
//!
//! Decimals are stored as canonical strings and timestamps as RFC 3339 text,
//! so every row type converts into its domain type through a fallible
//! `TryFrom` that reports malformed columns as [`Error::Parse`].

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    audit_logs, auth_tokens, group_access_requests, group_markets, market_groups, markets,
    outcomes, positions, profiles, trades, users,
};
use crate::domain::{
    AccessRequest, AccessRequestId, AuditLogId, BanState, Group, GroupId, MarketCategory,
    MarketId, MarketState, MarketStatus, Outcome, OutcomeId, Profile, Trade, TradeId, User,
    UserId,
};
use crate::error::{Error, Result};

/// Fixed-width UTC timestamps sort correctly as text.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("{column}: {e}")))
}

fn parse_optional_timestamp(column: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|r| parse_timestamp(column, r)).transpose()
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| Error::Parse(format!("{column}: {e}")))
}

pub(crate) fn parse_column<T>(column: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| Error::Parse(format!("{column}: {e}")))
}

/// Database row for a user.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: UserId::new(row.id),
            created_at: parse_timestamp("users.created_at", &row.created_at)?,
            username: row.username,
            email: row.email,
            is_superuser: row.is_superuser,
            is_staff: row.is_staff,
            is_active: row.is_active,
        })
    }
}

/// Database row for a profile.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProfileRow {
    pub user_id: i32,
    pub bio: String,
    pub balance: String,
    pub currency: String,
    pub role: String,
    pub tier: String,
    pub avatar_url: Option<String>,
    pub joined_date: String,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<String>,
    pub banned_by: Option<i32>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = profiles)]
pub struct NewProfileRow {
    pub user_id: i32,
    pub role: String,
    pub joined_date: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = Error;

    fn try_from(row: ProfileRow) -> Result<Self> {
        let ban = if row.is_banned {
            BanState::Banned {
                reason: row.ban_reason,
                banned_at: match row.banned_at.as_deref() {
                    Some(raw) => parse_timestamp("profiles.banned_at", raw)?,
                    None => return Err(Error::Parse("profiles.banned_at: missing".into())),
                },
                banned_by: row.banned_by.map(UserId::new),
            }
        } else {
            BanState::Active
        };
        Ok(Profile {
            user_id: UserId::new(row.user_id),
            bio: Some(row.bio).filter(|b| !b.is_empty()),
            balance: parse_decimal("profiles.balance", &row.balance)?,
            currency: row.currency,
            role: parse_column("profiles.role", &row.role)?,
            tier: parse_column("profiles.tier", &row.tier)?,
            avatar_url: row.avatar_url,
            joined_date: NaiveDate::parse_from_str(&row.joined_date, "%Y-%m-%d")
                .map_err(|e| Error::Parse(format!("profiles.joined_date: {e}")))?,
            ban,
        })
    }
}

/// Database row for an auth token.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = auth_tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuthTokenRow {
    pub key: String,
    pub user_id: i32,
    pub created_at: String,
}

/// Database row for a market.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketRow {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub status: String,
    pub volume: String,
    pub change_24h: f64,
    pub end_date: String,
    pub winner_id: Option<i32>,
    pub created_by: Option<i32>,
    pub resolved_by: Option<i32>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = markets)]
pub struct NewMarketRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub image_url: Option<&'a str>,
    pub category: &'static str,
    pub status: &'static str,
    pub volume: String,
    pub end_date: String,
    pub created_by: Option<i32>,
    pub created_at: String,
}

impl MarketRow {
    /// Rebuild the lifecycle state, rejecting rows that break the
    /// resolved-iff-winner invariant.
    pub fn state(&self) -> Result<MarketState> {
        let status: MarketStatus = parse_column("markets.status", &self.status)?;
        match (status, self.winner_id, self.resolved_by) {
            (MarketStatus::Open, _, _) => Ok(MarketState::Open),
            (MarketStatus::Cancelled, _, _) => Ok(MarketState::Cancelled),
            (MarketStatus::Resolved, Some(winner), Some(resolver)) => Ok(MarketState::Resolved {
                winner: OutcomeId::new(winner),
                resolved_by: UserId::new(resolver),
            }),
            (MarketStatus::Resolved, _, _) => Err(Error::Parse(format!(
                "market {} is RESOLVED without winner or resolver",
                self.id
            ))),
        }
    }

    pub fn category(&self) -> Result<MarketCategory> {
        parse_column("markets.category", &self.category)
    }
}

/// Database row for an outcome.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = outcomes)]
#[diesel(belongs_to(MarketRow, foreign_key = market_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OutcomeRow {
    pub id: i32,
    pub market_id: i32,
    pub label: String,
    pub probability: f64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = outcomes)]
pub struct NewOutcomeRow<'a> {
    pub market_id: i32,
    pub label: &'a str,
    pub probability: f64,
}

impl From<OutcomeRow> for Outcome {
    fn from(row: OutcomeRow) -> Self {
        Outcome {
            id: OutcomeId::new(row.id),
            market_id: MarketId::new(row.market_id),
            label: row.label,
            probability: row.probability,
        }
    }
}

/// Database row for a position.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionRow {
    pub id: i32,
    pub user_id: i32,
    pub market_id: i32,
    pub outcome_id: i32,
    pub side: String,
    pub shares: String,
    pub avg_price: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = positions)]
pub struct NewPositionRow {
    pub user_id: i32,
    pub market_id: i32,
    pub outcome_id: i32,
    pub side: &'static str,
    pub shares: String,
    pub avg_price: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Database row for a trade.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TradeRow {
    pub id: i32,
    pub user_id: i32,
    pub market_id: i32,
    pub outcome_id: i32,
    pub side: String,
    pub shares: String,
    pub price: String,
    pub total_value: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = trades)]
pub struct NewTradeRow {
    pub user_id: i32,
    pub market_id: i32,
    pub outcome_id: i32,
    pub side: &'static str,
    pub shares: String,
    pub price: String,
    pub total_value: String,
    pub status: &'static str,
    pub created_at: String,
}

impl TryFrom<TradeRow> for Trade {
    type Error = Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        Ok(Trade {
            id: TradeId::new(row.id),
            user_id: UserId::new(row.user_id),
            market_id: MarketId::new(row.market_id),
            outcome_id: OutcomeId::new(row.outcome_id),
            side: parse_column("trades.side", &row.side)?,
            shares: parse_decimal("trades.shares", &row.shares)?,
            price: parse_decimal("trades.price", &row.price)?,
            total_value: parse_decimal("trades.total_value", &row.total_value)?,
            status: parse_column("trades.status", &row.status)?,
            timestamp: parse_timestamp("trades.created_at", &row.created_at)?,
        })
    }
}

/// Database row for an audit entry.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = audit_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditLogRow {
    pub id: i32,
    pub user_id: i32,
    pub action: String,
    pub target: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLogRow {
    pub user_id: i32,
    pub action: &'static str,
    pub target: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

impl AuditLogRow {
    pub fn into_entry(self, username: String) -> Result<crate::domain::AuditEntry> {
        Ok(crate::domain::AuditEntry {
            id: AuditLogId::new(self.id),
            user_id: UserId::new(self.user_id),
            username,
            action: parse_column("audit_logs.action", &self.action)?,
            target: self.target,
            details: self.details,
            ip_address: self.ip_address,
            timestamp: parse_timestamp("audit_logs.created_at", &self.created_at)?,
        })
    }
}

/// Database row for a group.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = market_groups)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupRow {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub privacy: String,
    pub owner_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = market_groups)]
pub struct NewGroupRow<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub privacy: &'static str,
    pub owner_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<GroupRow> for Group {
    type Error = Error;

    fn try_from(row: GroupRow) -> Result<Self> {
        Ok(Group {
            id: GroupId::new(row.id),
            privacy: parse_column("market_groups.privacy", &row.privacy)?,
            owner_id: UserId::new(row.owner_id),
            created_at: parse_timestamp("market_groups.created_at", &row.created_at)?,
            updated_at: parse_timestamp("market_groups.updated_at", &row.updated_at)?,
            name: row.name,
            description: row.description,
            category: row.category,
        })
    }
}

/// Database row for an access request.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = group_access_requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccessRequestRow {
    pub id: i32,
    pub group_id: i32,
    pub user_id: i32,
    pub status: String,
    pub message: String,
    pub requested_at: String,
    pub responded_at: Option<String>,
    pub responded_by: Option<i32>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = group_access_requests)]
pub struct NewAccessRequestRow<'a> {
    pub group_id: i32,
    pub user_id: i32,
    pub status: &'static str,
    pub message: &'a str,
    pub requested_at: String,
}

impl AccessRequestRow {
    pub fn into_request(self, username: String) -> Result<AccessRequest> {
        Ok(AccessRequest {
            id: AccessRequestId::new(self.id),
            group_id: GroupId::new(self.group_id),
            user_id: UserId::new(self.user_id),
            username,
            status: parse_column("group_access_requests.status", &self.status)?,
            message: self.message,
            requested_at: parse_timestamp("group_access_requests.requested_at", &self.requested_at)?,
            responded_at: parse_optional_timestamp(
                "group_access_requests.responded_at",
                self.responded_at.as_deref(),
            )?,
            responded_by: self.responded_by.map(UserId::new),
        })
    }
}

/// Database row for a group/market link.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = group_markets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupMarketRow {
    pub id: i32,
    pub group_id: i32,
    pub market_id: i32,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = group_markets)]
pub struct NewGroupMarketRow {
    pub group_id: i32,
    pub market_id: i32,
    pub created_at: String,
}
