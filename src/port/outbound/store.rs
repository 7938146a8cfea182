//! Persistence ports.
//!
//! Each method that mutates state and carries a [`NewAuditEntry`] must write
//! the state change and the audit row in one transaction: either both are
//! committed or neither is.

use std::collections::HashMap;
use std::future::Future;

use crate::domain::{
    AccessDecision, AccessRequest, AccessRequestId, Account, Actor, AuditEntry, AuditFilter,
    Group, GroupDetail, GroupId, GroupMarket, Market, MarketFilter, MarketId, NewAuditEntry,
    NewGroup, NewMarket, NewUser, OutcomeId, Permission, Position, Profile, Roster, Trade,
    TradeOrder, User, UserId,
};
use crate::error::Result;

/// A stored user with its password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Identity asserted by an external token issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub subject: String,
    pub email: String,
    pub is_admin: bool,
}

/// Terminal market transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketTransition {
    Resolve {
        winner: OutcomeId,
        resolved_by: UserId,
    },
    Cancel,
}

/// Users, profiles, credentials, tokens and permission grants.
pub trait AccountStore: Send + Sync {
    /// Create a user and its profile in one transaction.
    fn create_user(&self, user: &NewUser) -> impl Future<Output = Result<Account>> + Send;

    /// Look up a user and password hash by username.
    fn credentials(&self, username: &str)
        -> impl Future<Output = Result<Option<Credentials>>> + Send;

    /// Load a user with its profile.
    fn account(&self, user_id: UserId) -> impl Future<Output = Result<Option<Account>>> + Send;

    /// Build the normalized actor for a user: roles, permissions, groups, ban state.
    fn actor(&self, user_id: UserId) -> impl Future<Output = Result<Option<Actor>>> + Send;

    /// Replace a user's password hash.
    fn set_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Return the user's token, storing `candidate` if none exists yet.
    fn issue_token(
        &self,
        user_id: UserId,
        candidate: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Resolve an opaque token to its user.
    fn token_owner(&self, key: &str) -> impl Future<Output = Result<Option<UserId>>> + Send;

    /// Find or create the local user for an external identity, syncing its
    /// email and admin status. Fails with `AuthenticationFailed` when the
    /// username belongs to an account with a usable password.
    fn provision_external(
        &self,
        identity: &ExternalIdentity,
    ) -> impl Future<Output = Result<UserId>> + Send;

    /// Set ban fields on the target's profile.
    fn ban(
        &self,
        target: UserId,
        banned_by: UserId,
        reason: Option<&str>,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<Profile>> + Send;

    /// Clear every ban field on the target's profile.
    fn unban(
        &self,
        target: UserId,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<Profile>> + Send;

    /// Create missing role groups and attach their permissions.
    fn ensure_role_groups(
        &self,
        groups: &[(&'static str, Vec<Permission>)],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Put a user in a role group (idempotent).
    fn assign_role(&self, user_id: UserId, role: &str) -> impl Future<Output = Result<()>> + Send;

    /// Grant a permission directly to a user (idempotent).
    fn grant_permission(
        &self,
        user_id: UserId,
        permission: Permission,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Markets and their lifecycle.
pub trait MarketStore: Send + Sync {
    /// Insert a market and its outcomes. The audit target is rewritten to
    /// name the new market once its id is known.
    fn create_market(
        &self,
        created_by: UserId,
        market: &NewMarket,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<Market>> + Send;

    fn market(&self, id: MarketId) -> impl Future<Output = Result<Option<Market>>> + Send;

    fn markets(&self, filter: MarketFilter) -> impl Future<Output = Result<Vec<Market>>> + Send;

    /// Move an `OPEN` market to a terminal state with a compare-and-set on
    /// status. Fails with `InvalidState` if the market is no longer open.
    fn transition_market(
        &self,
        id: MarketId,
        transition: MarketTransition,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<Market>> + Send;

    /// Invite-only groups each market is linked to. Markets without such
    /// links are absent from the map.
    fn invite_groups(
        &self,
        markets: &[MarketId],
    ) -> impl Future<Output = Result<HashMap<MarketId, Vec<GroupId>>>> + Send;
}

/// Trades and positions.
pub trait LedgerStore: Send + Sync {
    /// Append a trade, upsert the position and bump market volume atomically.
    fn record_trade(
        &self,
        user_id: UserId,
        order: &TradeOrder,
    ) -> impl Future<Output = Result<Trade>> + Send;

    fn positions(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Position>>> + Send;

    /// Trades, optionally limited to one user, newest first.
    fn trades(&self, user_id: Option<UserId>) -> impl Future<Output = Result<Vec<Trade>>> + Send;
}

/// Groups, membership, access requests and market links.
pub trait GroupStore: Send + Sync {
    fn create_group(
        &self,
        owner: UserId,
        group: &NewGroup,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<Group>> + Send;

    fn group(&self, id: GroupId) -> impl Future<Output = Result<Option<Group>>> + Send;

    fn roster(&self, id: GroupId) -> impl Future<Output = Result<Roster>> + Send;

    fn group_detail(&self, id: GroupId)
        -> impl Future<Output = Result<Option<GroupDetail>>> + Send;

    /// Public groups plus, for a viewer, groups they own, administer or belong to.
    fn groups_visible_to(
        &self,
        viewer: Option<UserId>,
    ) -> impl Future<Output = Result<Vec<Group>>> + Send;

    fn access_request(
        &self,
        id: AccessRequestId,
    ) -> impl Future<Output = Result<Option<AccessRequest>>> + Send;

    fn access_request_for(
        &self,
        group: GroupId,
        user: UserId,
    ) -> impl Future<Output = Result<Option<AccessRequest>>> + Send;

    fn create_access_request(
        &self,
        group: GroupId,
        user: UserId,
        message: &str,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<AccessRequest>> + Send;

    /// Settle a pending request; approval adds the requester to the members.
    fn decide_access_request(
        &self,
        id: AccessRequestId,
        decision: AccessDecision,
        responder: UserId,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<AccessRequest>> + Send;

    fn pending_requests(
        &self,
        group: GroupId,
    ) -> impl Future<Output = Result<Vec<AccessRequest>>> + Send;

    /// Link a market; fails with `AlreadyExists` for an existing link.
    fn link_market(
        &self,
        group: GroupId,
        market: MarketId,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<GroupMarket>> + Send;

    /// Unlink a market; fails with `NotFound` when no link exists.
    fn unlink_market(
        &self,
        group: GroupId,
        market: MarketId,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<()>> + Send;

    fn add_admin(
        &self,
        group: GroupId,
        user: UserId,
        audit: NewAuditEntry,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Read access to the audit trail.
pub trait AuditStore: Send + Sync {
    fn audit_entries(
        &self,
        filter: AuditFilter,
    ) -> impl Future<Output = Result<Vec<AuditEntry>>> + Send;
}
