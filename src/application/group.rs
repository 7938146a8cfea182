//! Groups, membership and the access-request workflow.
//!
//! A `PENDING` request moves exactly once to `APPROVED` or `DENIED`. Approval
//! adds the requester to the member set in the same transaction. Only the
//! owner and group admins may decide requests or change the group's market
//! links; only the owner may promote admins.

use serde::Serialize;
use tracing::{info, warn};

use crate::application::authorization::{Action, AuthorizationEngine, Resource};
use crate::domain::{
    AccessDecision, AccessRequest, AccessRequestId, AccessRequestStatus, Actor, AuditAction,
    DomainError, Group, GroupDetail, GroupId, GroupMarket, MarketId, NewAuditEntry, NewGroup,
    Privacy, Roster, UserId,
};
use crate::error::{Error, Result, StateError};
use crate::port::outbound::store::{GroupStore, MarketStore};

/// Group detail as seen by a particular caller.
#[derive(Debug, Clone)]
pub struct GroupView {
    pub detail: GroupDetail,
    pub member_count: usize,
    pub is_member: bool,
    pub is_owner: bool,
    pub is_admin: bool,
    /// Present only when the caller may manage the group.
    pub pending_requests: Option<Vec<AccessRequest>>,
}

/// Decision summary returned by approve/deny.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub request: AccessRequest,
    pub member_count: usize,
}

/// Group use cases.
#[derive(Clone)]
pub struct GroupService<G, M> {
    groups: G,
    markets: M,
    authz: AuthorizationEngine,
}

impl<G: GroupStore, M: MarketStore> GroupService<G, M> {
    pub fn new(groups: G, markets: M) -> Self {
        Self {
            groups,
            markets,
            authz: AuthorizationEngine,
        }
    }

    async fn load(&self, id: GroupId) -> Result<(Group, Roster)> {
        let group = self
            .groups
            .group(id)
            .await?
            .ok_or_else(|| Error::not_found("group", id))?;
        let roster = self.groups.roster(id).await?;
        Ok((group, roster))
    }

    fn require_manager(&self, actor: &Actor, group: &Group, roster: &Roster) -> Result<()> {
        let resource = Resource::Group {
            roster,
            invite_only: group.privacy == Privacy::Invite,
        };
        if let Err(err) = self.authz.require(
            actor,
            Action::ManageGroup,
            resource,
            "only the group owner or admins can do this",
        ) {
            warn!(group_id = %group.id, actor = %actor.user_id, "Group management denied");
            return Err(err);
        }
        Ok(())
    }

    /// Create a group owned by the caller.
    ///
    /// # Errors
    /// Fails for banned actors or on storage errors.
    pub async fn create(&self, actor: &Actor, group: NewGroup) -> Result<Group> {
        self.authz.ensure_active(actor)?;
        let audit = NewAuditEntry::by(actor, AuditAction::CreateGroup, format!("Group: {}", group.name))
            .details(format!("Privacy: {}", group.privacy.as_str()));
        let created = self.groups.create_group(actor.user_id, &group, audit).await?;
        info!(group_id = %created.id, owner = %actor.user_id, privacy = created.privacy.as_str(), "Group created");
        Ok(created)
    }

    /// Groups visible to the caller.
    ///
    /// # Errors
    /// Fails on storage errors.
    pub async fn list(&self, actor: Option<&Actor>) -> Result<Vec<Group>> {
        self.groups.groups_visible_to(actor.map(|a| a.user_id)).await
    }

    /// Group detail with the caller's relationship to it. Invite-only groups
    /// are reported as missing to outsiders.
    ///
    /// # Errors
    /// Returns `NotFound` for a missing or hidden group.
    pub async fn detail(&self, id: GroupId, actor: Option<&Actor>) -> Result<GroupView> {
        let detail = self
            .groups
            .group_detail(id)
            .await?
            .ok_or_else(|| Error::not_found("group", id))?;
        let invite_only = detail.group.privacy == Privacy::Invite;
        let roster = &detail.roster;

        let visible = match actor {
            None => !invite_only,
            Some(actor) => self.authz.can(
                actor,
                Action::ViewGroup,
                Resource::Group {
                    roster,
                    invite_only,
                },
            ),
        };
        if !visible {
            return Err(Error::not_found("group", id));
        }

        let caller = actor.map(|a| a.user_id);
        let is_owner = caller.is_some_and(|u| roster.is_owner(u));
        let is_admin = caller.is_some_and(|u| roster.is_admin(u));
        let is_member = caller.is_some_and(|u| roster.is_member(u));
        let member_count = roster.member_count();

        let pending_requests = if is_admin {
            Some(self.groups.pending_requests(id).await?)
        } else {
            None
        };
        Ok(GroupView {
            detail,
            member_count,
            is_member,
            is_owner,
            is_admin,
            pending_requests,
        })
    }

    /// Ask to join a group.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyMember`, `DuplicateRequest` while one is pending,
    /// or `InvalidState` once a request has been decided.
    pub async fn request_access(
        &self,
        id: GroupId,
        actor: &Actor,
        message: Option<String>,
    ) -> Result<AccessRequest> {
        self.authz.ensure_active(actor)?;
        let (group, roster) = self.load(id).await?;
        if roster.is_member(actor.user_id) {
            return Err(StateError::AlreadyMember.into());
        }

        if let Some(existing) = self.groups.access_request_for(id, actor.user_id).await? {
            return Err(match existing.status {
                AccessRequestStatus::Pending => StateError::DuplicateRequest,
                status => StateError::InvalidState(format!(
                    "your access request for this group was already {}",
                    status.as_str().to_lowercase()
                )),
            }
            .into());
        }

        let message = message.unwrap_or_default();
        let audit = NewAuditEntry::by(actor, AuditAction::RequestAccess, group.audit_target());
        let request = self
            .groups
            .create_access_request(id, actor.user_id, &message, audit)
            .await?;
        info!(group_id = %id, request_id = %request.id, user_id = %actor.user_id, "Access requested");
        Ok(request)
    }

    /// Approve a pending request, adding the requester as a member.
    ///
    /// # Errors
    /// See [`GroupService::decide`].
    pub async fn approve(
        &self,
        id: GroupId,
        request: AccessRequestId,
        actor: &Actor,
    ) -> Result<DecisionOutcome> {
        self.decide(id, request, AccessDecision::Approve, actor).await
    }

    /// Deny a pending request.
    ///
    /// # Errors
    /// See [`GroupService::decide`].
    pub async fn deny(
        &self,
        id: GroupId,
        request: AccessRequestId,
        actor: &Actor,
    ) -> Result<DecisionOutcome> {
        self.decide(id, request, AccessDecision::Deny, actor).await
    }

    /// # Errors
    /// `NotFound` for the group, `PermissionDenied` for non-managers,
    /// `NotFound` for a request of another group, `InvalidState` when the
    /// request is no longer pending.
    async fn decide(
        &self,
        id: GroupId,
        request_id: AccessRequestId,
        decision: AccessDecision,
        actor: &Actor,
    ) -> Result<DecisionOutcome> {
        let (group, roster) = self.load(id).await?;
        self.require_manager(actor, &group, &roster)?;

        let request = self
            .groups
            .access_request(request_id)
            .await?
            .filter(|r| r.group_id == id)
            .ok_or_else(|| Error::not_found("access request", request_id))?;

        let action = match decision {
            AccessDecision::Approve => AuditAction::ApproveAccess,
            AccessDecision::Deny => AuditAction::DenyAccess,
        };
        let audit = NewAuditEntry::by(actor, action, group.audit_target())
            .details(format!("User: {}", request.username));
        let decided = self
            .groups
            .decide_access_request(request_id, decision, actor.user_id, audit)
            .await?;
        let member_count = self.groups.roster(id).await?.member_count();
        info!(
            group_id = %id,
            request_id = %request_id,
            status = %decided.status,
            responder = %actor.user_id,
            "Access request decided"
        );
        Ok(DecisionOutcome {
            request: decided,
            member_count,
        })
    }

    /// Pending requests of a group, for its managers.
    ///
    /// # Errors
    /// `NotFound` or `PermissionDenied`.
    pub async fn pending_requests(&self, id: GroupId, actor: &Actor) -> Result<Vec<AccessRequest>> {
        let (group, roster) = self.load(id).await?;
        self.require_manager(actor, &group, &roster)?;
        self.groups.pending_requests(id).await
    }

    /// Link a market to the group.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied`, or `AlreadyExists` for an existing link.
    pub async fn add_market(
        &self,
        id: GroupId,
        market_id: MarketId,
        actor: &Actor,
    ) -> Result<GroupMarket> {
        let (group, roster) = self.load(id).await?;
        self.require_manager(actor, &group, &roster)?;
        let market = self
            .markets
            .market(market_id)
            .await?
            .ok_or_else(|| Error::not_found("market", market_id))?;

        let audit = NewAuditEntry::by(actor, AuditAction::AddGroupMarket, group.audit_target())
            .details(market.audit_target());
        let link = self.groups.link_market(id, market_id, audit).await?;
        info!(group_id = %id, market_id = %market_id, "Market linked to group");
        Ok(link)
    }

    /// Remove a market link.
    ///
    /// # Errors
    /// `NotFound` for a missing group, market or link, or `PermissionDenied`.
    pub async fn remove_market(&self, id: GroupId, market_id: MarketId, actor: &Actor) -> Result<()> {
        let (group, roster) = self.load(id).await?;
        self.require_manager(actor, &group, &roster)?;
        let market = self
            .markets
            .market(market_id)
            .await?
            .ok_or_else(|| Error::not_found("market", market_id))?;

        let audit = NewAuditEntry::by(actor, AuditAction::RemoveGroupMarket, group.audit_target())
            .details(market.audit_target());
        self.groups.unlink_market(id, market_id, audit).await?;
        info!(group_id = %id, market_id = %market_id, "Market unlinked from group");
        Ok(())
    }

    /// Promote a member to group admin. Owner only.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied`, a validation error when the target is
    /// not a member, or `AlreadyExists` when they already are an admin.
    pub async fn add_admin(&self, id: GroupId, user: UserId, actor: &Actor) -> Result<Roster> {
        let (group, roster) = self.load(id).await?;
        let resource = Resource::Group {
            roster: &roster,
            invite_only: group.privacy == Privacy::Invite,
        };
        if let Err(err) = self.authz.require(
            actor,
            Action::AddGroupAdmin,
            resource,
            "only the group owner can add admins",
        ) {
            warn!(group_id = %id, actor = %actor.user_id, "Add admin denied");
            return Err(err);
        }
        if !roster.is_member(user) {
            return Err(DomainError::InvalidValue {
                field: "user_id",
                reason: "user must be a member of the group".into(),
            }
            .into());
        }
        if roster.is_admin(user) {
            return Err(StateError::AlreadyExists(format!("admin {user} of group {id}")).into());
        }

        let audit = NewAuditEntry::by(actor, AuditAction::AddGroupAdmin, group.audit_target())
            .details(format!("User: {user}"));
        self.groups.add_admin(id, user, audit).await?;
        info!(group_id = %id, user_id = %user, "Group admin added");
        self.groups.roster(id).await
    }
}
