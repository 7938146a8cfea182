//! Request and response bodies.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::{DecisionOutcome, GroupView, Session};
use crate::domain::{
    AccessRequest, AccessRequestId, Account, AuditAction, BanState, DomainError, Group,
    GroupMarket, Market, MarketCategory, MarketId, MarketStatus, MemberInfo, NewGroup, NewMarket,
    NewOutcome, Outcome, OutcomeId, Privacy, Profile, Role, Side, Tier, TradeOrder, UserId,
};

#[derive(Debug, Deserialize)]
pub struct OutcomeInput {
    pub label: String,
    pub probability: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: MarketCategory,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeInput>,
}

impl CreateMarketRequest {
    /// # Errors
    /// Validation errors from the market and outcome constructors.
    pub fn into_domain(self) -> Result<NewMarket, DomainError> {
        let outcomes = self
            .outcomes
            .into_iter()
            .map(|o| NewOutcome::try_new(o.label, o.probability))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewMarket::try_new(
            self.title,
            self.description,
            self.category,
            self.end_date,
            outcomes,
        )?
        .with_image_url(self.image_url))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MarketQuery {
    pub status: Option<MarketStatus>,
    pub category: Option<MarketCategory>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub winner_id: OutcomeId,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarketResponse {
    pub id: MarketId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: MarketCategory,
    pub status: MarketStatus,
    pub volume: Decimal,
    pub change_24h: f64,
    pub end_date: DateTime<Utc>,
    pub winner_id: Option<OutcomeId>,
    pub resolved_by: Option<UserId>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub outcomes: Vec<Outcome>,
}

impl From<Market> for MarketResponse {
    fn from(market: Market) -> Self {
        Self {
            status: market.status(),
            winner_id: market.winner(),
            resolved_by: market.resolved_by(),
            id: market.id,
            title: market.title,
            description: market.description,
            image_url: market.image_url,
            category: market.category,
            volume: market.volume,
            change_24h: market.change_24h,
            end_date: market.end_date,
            created_by: market.created_by,
            created_at: market.created_at,
            outcomes: market.outcomes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    #[serde(default)]
    pub side: Side,
    pub shares: Decimal,
    pub price: Decimal,
}

impl TradeRequest {
    /// # Errors
    /// Validation errors for non-positive or over-precise quantities.
    pub fn into_order(self) -> Result<TradeOrder, DomainError> {
        TradeOrder::try_new(
            self.market_id,
            self.outcome_id,
            self.side,
            self.shares,
            self.price,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub privacy: Privacy,
}

impl CreateGroupRequest {
    /// # Errors
    /// Validation errors for a blank or overlong name.
    pub fn into_domain(self) -> Result<NewGroup, DomainError> {
        NewGroup::try_new(self.name, self.description, self.category, self.privacy)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessRequestBody {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub request_id: AccessRequestId,
}

#[derive(Debug, Deserialize)]
pub struct GroupMarketRequest {
    pub market_id: MarketId,
}

#[derive(Debug, Deserialize)]
pub struct AddAdminRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
    #[serde(flatten)]
    pub group: Group,
    pub owner: MemberInfo,
    pub admins: Vec<MemberInfo>,
    pub members: Vec<MemberInfo>,
    pub markets: Vec<GroupMarket>,
    pub member_count: usize,
    pub is_member: bool,
    pub is_owner: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_requests: Option<Vec<AccessRequest>>,
}

impl From<GroupView> for GroupDetailResponse {
    fn from(view: GroupView) -> Self {
        Self {
            group: view.detail.group,
            owner: view.detail.owner,
            admins: view.detail.admins,
            members: view.detail.members,
            markets: view.detail.markets,
            member_count: view.member_count,
            is_member: view.is_member,
            is_owner: view.is_owner,
            is_admin: view.is_admin,
            pending_requests: view.pending_requests,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub message: String,
    pub request: AccessRequest,
    pub member_count: usize,
}

impl From<DecisionOutcome> for DecisionResponse {
    fn from(outcome: DecisionOutcome) -> Self {
        Self {
            message: format!(
                "Access request for {} {}",
                outcome.request.username,
                outcome.request.status.as_str().to_lowercase()
            ),
            request: outcome.request,
            member_count: outcome.member_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BanRequest {
    pub reason: Option<String>,
}

/// Profile with the ban state flattened into plain fields.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub bio: Option<String>,
    pub balance: Decimal,
    pub currency: String,
    pub role: Role,
    pub tier: Tier,
    pub avatar_url: Option<String>,
    pub joined_date: NaiveDate,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<DateTime<Utc>>,
    pub banned_by: Option<UserId>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let (is_banned, ban_reason, banned_at, banned_by) = match profile.ban {
            BanState::Active => (false, None, None, None),
            BanState::Banned {
                reason,
                banned_at,
                banned_by,
            } => (true, reason, Some(banned_at), banned_by),
        };
        Self {
            bio: profile.bio,
            balance: profile.balance,
            currency: profile.currency,
            role: profile.role,
            tier: profile.tier,
            avatar_url: profile.avatar_url,
            joined_date: profile.joined_date,
            is_banned,
            ban_reason,
            banned_at,
            banned_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub profile: ProfileResponse,
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.user.id,
            username: account.user.username,
            email: account.user.email,
            is_superuser: account.user.is_superuser,
            is_staff: account.user.is_staff,
            created_at: account.user.created_at,
            profile: account.profile.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user: session.account.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BanResponse {
    pub user_id: UserId,
    pub profile: ProfileResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    pub user_id: Option<UserId>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
