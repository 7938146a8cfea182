//! Trade recording and position reads.

use tracing::{info, warn};

use crate::application::authorization::{Action, AuthorizationEngine, Resource};
use crate::domain::{Actor, Position, Trade, TradeOrder};
use crate::error::{Error, Result, StateError};
use crate::port::outbound::store::{LedgerStore, MarketStore};

/// Ledger use cases.
#[derive(Clone)]
pub struct LedgerService<L, M> {
    ledger: L,
    markets: M,
    authz: AuthorizationEngine,
}

impl<L: LedgerStore, M: MarketStore> LedgerService<L, M> {
    pub fn new(ledger: L, markets: M) -> Self {
        Self {
            ledger,
            markets,
            authz: AuthorizationEngine,
        }
    }

    /// Record a trade and update the trader's position and market volume.
    ///
    /// The store re-checks the market status inside its write transaction, so
    /// a trade racing a resolution either lands before it or fails with
    /// `InvalidState`.
    ///
    /// # Errors
    /// `UserBanned`, `NotFound`, `PermissionDenied` for restricted markets, a
    /// validation error for a foreign outcome or a position too large to hold,
    /// `InvalidState` for a closed market.
    pub async fn record_trade(&self, actor: &Actor, order: TradeOrder) -> Result<Trade> {
        self.authz.ensure_active(actor)?;
        let market = self
            .markets
            .market(order.market_id)
            .await?
            .ok_or_else(|| Error::not_found("market", order.market_id))?;

        let invite_groups = self
            .markets
            .invite_groups(&[market.id])
            .await?
            .remove(&market.id)
            .unwrap_or_default();
        let resource = Resource::Market {
            created_by: market.created_by,
            invite_groups: &invite_groups,
        };
        if !self.authz.can(actor, Action::Trade, resource) {
            warn!(market_id = %market.id, actor = %actor.user_id, "Trade denied: restricted market");
            return Err(Error::permission_denied(
                "this market is restricted to group members",
            ));
        }

        market.require_outcome(order.outcome_id)?;
        if !market.is_open() {
            return Err(StateError::InvalidState(format!(
                "market {} is {}; trading is closed",
                market.id,
                market.status()
            ))
            .into());
        }

        let trade = self.ledger.record_trade(actor.user_id, &order).await?;
        info!(
            trade_id = %trade.id,
            user_id = %actor.user_id,
            market_id = %order.market_id,
            side = %order.side,
            shares = %order.shares,
            price = %order.price,
            "Trade recorded"
        );
        Ok(trade)
    }

    /// The caller's positions.
    ///
    /// # Errors
    /// Fails on storage errors.
    pub async fn positions(&self, actor: &Actor) -> Result<Vec<Position>> {
        self.ledger.positions(actor.user_id).await
    }

    /// Trades visible to the caller: all of them for admins, otherwise their own.
    ///
    /// # Errors
    /// Fails on storage errors.
    pub async fn trades(&self, actor: &Actor) -> Result<Vec<Trade>> {
        let scope = if self.authz.can(actor, Action::ViewAllTrades, Resource::System) {
            None
        } else {
            Some(actor.user_id)
        };
        self.ledger.trades(scope).await
    }
}
