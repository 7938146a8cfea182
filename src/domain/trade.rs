//! Trade records.
//!
//! A [`Trade`] is an immutable record of one executed order. Trades are only
//! ever appended; nothing updates or deletes them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OutcomeId, TradeId, UserId};
use super::position::Side;

/// Maximum decimal places accepted on a share quantity.
pub const SHARES_SCALE: u32 = 8;

/// Decimal places kept on monetary totals.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive bound on a share quantity: twenty digits, eight of them decimal.
#[must_use]
pub fn max_shares() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

/// Exclusive bound on a monetary amount: twenty digits, two of them decimal.
#[must_use]
pub fn max_money() -> Decimal {
    Decimal::new(1_000_000_000_000_000_000, 0)
}

/// Execution status of a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    #[default]
    Completed,
    Failed,
}

impl TradeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            other => Err(DomainError::unknown("trade status", other)),
        }
    }
}

/// A persisted trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub side: Side,
    pub shares: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub status: TradeStatus,
    pub timestamp: DateTime<Utc>,
}

/// Validated order to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeOrder {
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub side: Side,
    pub shares: Decimal,
    pub price: Decimal,
}

impl TradeOrder {
    /// Validate quantities of an order.
    ///
    /// # Errors
    /// Returns [`DomainError`] when shares or price are not strictly positive,
    /// when shares carry more than eight decimal places, or when shares or the
    /// order total do not fit the ledger's columns.
    pub fn try_new(
        market_id: MarketId,
        outcome_id: OutcomeId,
        side: Side,
        shares: Decimal,
        price: Decimal,
    ) -> Result<Self, DomainError> {
        if shares <= Decimal::ZERO {
            return Err(DomainError::NonPositiveShares { shares });
        }
        if shares.normalize().scale() > SHARES_SCALE {
            return Err(DomainError::SharesPrecision { shares });
        }
        if shares >= max_shares() {
            return Err(DomainError::TooLarge {
                field: "shares",
                max: max_shares(),
            });
        }
        if price <= Decimal::ZERO {
            return Err(DomainError::NonPositivePrice { price });
        }
        let order = Self {
            market_id,
            outcome_id,
            side,
            shares,
            price,
        };
        order.total_value()?;
        Ok(order)
    }

    /// `shares * price`, rounded half away from zero to cents.
    ///
    /// # Errors
    /// Returns [`DomainError::TooLarge`] when the total overflows or does not
    /// fit a monetary column.
    pub fn total_value(&self) -> Result<Decimal, DomainError> {
        self.shares
            .checked_mul(self.price)
            .map(|total| {
                total.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
            })
            .filter(|total| *total < max_money())
            .ok_or(DomainError::TooLarge {
                field: "total value",
                max: max_money(),
            })
    }
}
