//! Authorization decisions.
//!
//! One engine answers every "may this actor do that" question, whatever
//! authentication path produced the [`Actor`]. Banned actors are denied
//! everything.

use crate::domain::{Actor, GroupId, Permission, Roster, UserId, ADMIN_ROLE_GROUP};
use crate::error::{AccessError, Error, Result};

/// Things an actor may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateMarket,
    ViewMarket,
    ResolveMarket,
    CancelMarket,
    Trade,
    ViewAllTrades,
    BanUser,
    ViewAuditLog,
    ViewGroup,
    ManageGroup,
    AddGroupAdmin,
}

/// What the action is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    System,
    Market {
        created_by: Option<UserId>,
        /// Invite-only groups the market is linked to.
        invite_groups: &'a [GroupId],
    },
    Group {
        roster: &'a Roster,
        invite_only: bool,
    },
}

/// Stateless policy engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEngine;

impl AuthorizationEngine {
    /// Superuser, staff, or member of the `Admin` role group.
    #[must_use]
    pub fn is_admin(&self, actor: &Actor) -> bool {
        actor.is_superuser || actor.is_staff || actor.has_role(ADMIN_ROLE_GROUP)
    }

    fn admin_or(&self, actor: &Actor, permission: Permission) -> bool {
        self.is_admin(actor) || actor.has_permission(permission)
    }

    fn in_any(actor: &Actor, groups: &[GroupId]) -> bool {
        groups.iter().any(|g| actor.groups.contains(g))
    }

    /// Decide whether `actor` may perform `action` on `resource`.
    #[must_use]
    pub fn can(&self, actor: &Actor, action: Action, resource: Resource<'_>) -> bool {
        if actor.is_banned {
            return false;
        }
        match (action, resource) {
            (Action::CreateMarket, _) => true,
            (Action::ViewMarket | Action::Trade, Resource::Market { invite_groups, .. }) => {
                invite_groups.is_empty()
                    || self.is_admin(actor)
                    || Self::in_any(actor, invite_groups)
            }
            (Action::ResolveMarket, Resource::Market { created_by, .. }) => {
                self.can_resolve(actor) && !self.violates_separation(actor, created_by)
            }
            (Action::ResolveMarket, _) => self.can_resolve(actor),
            (Action::CancelMarket, _) => self.admin_or(actor, Permission::HaltTrading),
            (Action::ViewAllTrades, _) => self.is_admin(actor),
            (Action::BanUser, _) => self.can_ban(actor),
            (Action::ViewAuditLog, _) => self.admin_or(actor, Permission::ViewAuditLog),
            (Action::ViewGroup, Resource::Group { roster, invite_only }) => {
                !invite_only || self.is_admin(actor) || roster.is_member(actor.user_id)
                    || roster.is_admin(actor.user_id)
            }
            (Action::ManageGroup, Resource::Group { roster, .. }) => roster.is_admin(actor.user_id),
            (Action::AddGroupAdmin, Resource::Group { roster, .. }) => {
                roster.is_owner(actor.user_id)
            }
            (Action::ViewMarket | Action::Trade, _) => true,
            (Action::ViewGroup | Action::ManageGroup | Action::AddGroupAdmin, _) => false,
        }
    }

    /// `can_resolve_market` or admin.
    #[must_use]
    pub fn can_resolve(&self, actor: &Actor) -> bool {
        self.admin_or(actor, Permission::ResolveMarket)
    }

    /// `can_ban_user` or admin.
    #[must_use]
    pub fn can_ban(&self, actor: &Actor) -> bool {
        self.admin_or(actor, Permission::BanUser)
    }

    /// A non-admin creator may not resolve their own market.
    #[must_use]
    pub fn violates_separation(&self, actor: &Actor, created_by: Option<UserId>) -> bool {
        created_by == Some(actor.user_id) && !self.is_admin(actor)
    }

    /// Reject banned actors outright.
    ///
    /// # Errors
    /// Returns [`AccessError::UserBanned`] for a banned actor.
    pub fn ensure_active(&self, actor: &Actor) -> Result<()> {
        if actor.is_banned {
            return Err(AccessError::UserBanned { reason: None }.into());
        }
        Ok(())
    }

    /// Turn a denied decision into a `PermissionDenied` error.
    ///
    /// # Errors
    /// Returns [`AccessError::PermissionDenied`] when `can` says no.
    pub fn require(
        &self,
        actor: &Actor,
        action: Action,
        resource: Resource<'_>,
        message: &str,
    ) -> Result<()> {
        self.ensure_active(actor)?;
        if self.can(actor, action, resource) {
            Ok(())
        } else {
            Err(Error::permission_denied(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn actor(id: i32) -> Actor {
        Actor::new(UserId::new(id), format!("user{id}"))
    }

    fn resolver(id: i32) -> Actor {
        let mut a = actor(id);
        a.permissions.insert(Permission::ResolveMarket);
        a
    }

    #[test]
    fn admin_predicate_covers_all_three_sources() {
        let engine = AuthorizationEngine;
        let mut su = actor(1);
        su.is_superuser = true;
        let mut staff = actor(2);
        staff.is_staff = true;
        let mut role = actor(3);
        role.roles.insert(ADMIN_ROLE_GROUP.to_string());

        for a in [&su, &staff, &role] {
            assert!(engine.is_admin(a));
            assert!(engine.can_resolve(a));
            assert!(engine.can_ban(a));
        }
        assert!(!engine.is_admin(&actor(4)));
    }

    #[test]
    fn creator_cannot_resolve_own_market_without_admin() {
        let engine = AuthorizationEngine;
        let creator = resolver(5);
        let market = Resource::Market {
            created_by: Some(UserId::new(5)),
            invite_groups: &[],
        };
        assert!(!engine.can(&creator, Action::ResolveMarket, market));
        assert!(engine.violates_separation(&creator, Some(UserId::new(5))));

        let mut admin_creator = creator.clone();
        admin_creator.is_staff = true;
        assert!(engine.can(&admin_creator, Action::ResolveMarket, market));

        assert!(engine.can(&resolver(6), Action::ResolveMarket, market));
        assert!(!engine.can(&actor(6), Action::ResolveMarket, market));
    }

    #[test]
    fn banned_actor_is_denied_everything() {
        let engine = AuthorizationEngine;
        let mut banned = resolver(7);
        banned.is_superuser = true;
        banned.is_banned = true;
        assert!(!engine.can(&banned, Action::CreateMarket, Resource::System));
        assert!(!engine.can(&banned, Action::ResolveMarket, Resource::System));
        assert!(engine.ensure_active(&banned).is_err());
    }

    #[test]
    fn restricted_market_needs_group_membership() {
        let engine = AuthorizationEngine;
        let groups = [GroupId::new(9)];
        let market = Resource::Market {
            created_by: None,
            invite_groups: &groups,
        };
        let outsider = actor(1);
        let mut insider = actor(2);
        insider.groups = BTreeSet::from([GroupId::new(9)]);

        assert!(!engine.can(&outsider, Action::Trade, market));
        assert!(engine.can(&insider, Action::Trade, market));
        assert!(engine.can(&insider, Action::ViewMarket, market));
    }

    #[test]
    fn group_management_is_owner_and_admins() {
        let engine = AuthorizationEngine;
        let roster = Roster {
            owner: Some(UserId::new(1)),
            admins: BTreeSet::from([UserId::new(2)]),
            members: BTreeSet::from([UserId::new(3)]),
        };
        let group = Resource::Group {
            roster: &roster,
            invite_only: true,
        };
        assert!(engine.can(&actor(1), Action::ManageGroup, group));
        assert!(engine.can(&actor(2), Action::ManageGroup, group));
        assert!(!engine.can(&actor(3), Action::ManageGroup, group));
        assert!(engine.can(&actor(1), Action::AddGroupAdmin, group));
        assert!(!engine.can(&actor(2), Action::AddGroupAdmin, group));
        assert!(engine.can(&actor(3), Action::ViewGroup, group));
        assert!(!engine.can(&actor(4), Action::ViewGroup, group));
    }
}
