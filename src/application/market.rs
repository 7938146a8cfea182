//! Market lifecycle service.
//!
//! `OPEN → RESOLVED` and `OPEN → CANCELLED` are the only transitions. Checks
//! run in a fixed order so callers always see the most specific failure:
//! existence, capability, separation of duties, winner validity, and finally
//! the compare-and-set in the store.

use tracing::{info, warn};

use crate::application::authorization::{Action, AuthorizationEngine, Resource};
use crate::domain::{
    Actor, AuditAction, GroupId, Market, MarketFilter, MarketId, NewAuditEntry, NewMarket,
    OutcomeId,
};
use crate::error::{AccessError, Error, Result};
use crate::port::outbound::store::{MarketStore, MarketTransition};

/// Market use cases.
#[derive(Clone)]
pub struct MarketService<M> {
    store: M,
    authz: AuthorizationEngine,
}

impl<M: MarketStore> MarketService<M> {
    pub fn new(store: M) -> Self {
        Self {
            store,
            authz: AuthorizationEngine,
        }
    }

    /// Create a market with its outcomes.
    ///
    /// # Errors
    /// Fails for banned actors or on storage errors.
    pub async fn create(&self, actor: &Actor, market: NewMarket) -> Result<Market> {
        self.authz
            .require(actor, Action::CreateMarket, Resource::System, "cannot create markets")?;
        let audit = NewAuditEntry::by(actor, AuditAction::CreateMarket, market.title.clone());
        let created = self.store.create_market(actor.user_id, &market, audit).await?;
        info!(
            market_id = %created.id,
            created_by = %actor.user_id,
            outcomes = created.outcomes.len(),
            "Market created"
        );
        Ok(created)
    }

    async fn invite_groups_of(&self, id: MarketId) -> Result<Vec<GroupId>> {
        Ok(self
            .store
            .invite_groups(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default())
    }

    fn visible(&self, actor: Option<&Actor>, market: &Market, invite_groups: &[GroupId]) -> bool {
        match actor {
            None => invite_groups.is_empty(),
            Some(actor) => self.authz.can(
                actor,
                Action::ViewMarket,
                Resource::Market {
                    created_by: market.created_by,
                    invite_groups,
                },
            ),
        }
    }

    /// Fetch a market. Restricted markets the caller may not see are reported
    /// as missing.
    ///
    /// # Errors
    /// Returns `NotFound` for a missing or hidden market.
    pub async fn get(&self, id: MarketId, actor: Option<&Actor>) -> Result<Market> {
        let market = self
            .store
            .market(id)
            .await?
            .ok_or_else(|| Error::not_found("market", id))?;
        let invite_groups = self.invite_groups_of(id).await?;
        if !self.visible(actor, &market, &invite_groups) {
            return Err(Error::not_found("market", id));
        }
        Ok(market)
    }

    /// List markets visible to the caller.
    ///
    /// # Errors
    /// Fails on storage errors.
    pub async fn list(&self, filter: MarketFilter, actor: Option<&Actor>) -> Result<Vec<Market>> {
        let markets = self.store.markets(filter).await?;
        let ids: Vec<MarketId> = markets.iter().map(|m| m.id).collect();
        let restricted = self.store.invite_groups(&ids).await?;
        Ok(markets
            .into_iter()
            .filter(|m| {
                let groups = restricted.get(&m.id).map_or(&[][..], Vec::as_slice);
                self.visible(actor, m, groups)
            })
            .collect())
    }

    /// Resolve an open market to one of its outcomes.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied`, `SeparationOfDuty`, a validation error
    /// for a foreign winner, or `InvalidState` when the market is not open.
    pub async fn resolve(&self, id: MarketId, winner: OutcomeId, actor: &Actor) -> Result<Market> {
        self.authz.ensure_active(actor)?;
        let market = self
            .store
            .market(id)
            .await?
            .ok_or_else(|| Error::not_found("market", id))?;

        if !self.authz.can_resolve(actor) {
            warn!(market_id = %id, actor = %actor.user_id, "Resolve denied: missing permission");
            return Err(Error::permission_denied(
                "you do not have permission to resolve markets",
            ));
        }
        if self.authz.violates_separation(actor, market.created_by) {
            warn!(market_id = %id, actor = %actor.user_id, "Resolve denied: creator cannot resolve");
            return Err(AccessError::SeparationOfDuty.into());
        }
        let outcome = market.require_outcome(winner)?;

        let audit = NewAuditEntry::by(actor, AuditAction::ResolveMarket, market.audit_target())
            .details(format!("Winner: {}", outcome.label));
        let resolved = self
            .store
            .transition_market(
                id,
                MarketTransition::Resolve {
                    winner,
                    resolved_by: actor.user_id,
                },
                audit,
            )
            .await?;
        info!(market_id = %id, winner = %winner, resolved_by = %actor.user_id, "Market resolved");
        Ok(resolved)
    }

    /// Cancel an open market.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied`, or `InvalidState` when the market is not open.
    pub async fn cancel(&self, id: MarketId, actor: &Actor, reason: Option<String>) -> Result<Market> {
        self.authz.ensure_active(actor)?;
        let market = self
            .store
            .market(id)
            .await?
            .ok_or_else(|| Error::not_found("market", id))?;

        if !self.authz.can(actor, Action::CancelMarket, Resource::System) {
            warn!(market_id = %id, actor = %actor.user_id, "Cancel denied");
            return Err(Error::permission_denied(
                "you do not have permission to cancel markets",
            ));
        }

        let mut audit = NewAuditEntry::by(actor, AuditAction::CancelMarket, market.audit_target());
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            audit = audit.details(reason);
        }
        let cancelled = self
            .store
            .transition_market(id, MarketTransition::Cancel, audit)
            .await?;
        info!(market_id = %id, cancelled_by = %actor.user_id, "Market cancelled");
        Ok(cancelled)
    }
}
