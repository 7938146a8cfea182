//! Position holdings.
//!
//! A position is a user's holding in one outcome of one market on one side.
//! Buying the opposite side of the same outcome opens a second, independent
//! position rather than netting against the first.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OutcomeId, PositionId, UserId};
use super::trade::max_shares;

/// Decimal places kept on a position's average price.
pub const AVG_PRICE_SCALE: u32 = 8;

/// Side of a trade or position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    #[default]
    Yes,
    No,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            other => Err(DomainError::unknown("side", other)),
        }
    }
}

/// Identity of a position: one row per combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub user_id: UserId,
    pub market_id: MarketId,
    pub outcome_id: OutcomeId,
    pub side: Side,
}

/// Shares and average entry price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Holding {
    pub shares: Decimal,
    pub avg_price: Decimal,
}

impl Holding {
    /// Add a fill, re-weighting the average price by share count.
    ///
    /// # Errors
    /// Returns [`DomainError::TooLarge`] when the combined holding no longer
    /// fits a share column or its cost basis overflows.
    pub fn add(self, shares: Decimal, price: Decimal) -> Result<Self, DomainError> {
        let total_shares = self
            .shares
            .checked_add(shares)
            .filter(|total| *total < max_shares())
            .ok_or(DomainError::TooLarge {
                field: "position shares",
                max: max_shares(),
            })?;
        if total_shares.is_zero() {
            return Ok(self);
        }
        let cost = self
            .shares
            .checked_mul(self.avg_price)
            .zip(shares.checked_mul(price))
            .and_then(|(held, fill)| held.checked_add(fill))
            .ok_or(DomainError::TooLarge {
                field: "position cost",
                max: Decimal::MAX,
            })?;
        let avg_price = (cost / total_shares).round_dp(AVG_PRICE_SCALE).normalize();
        Ok(Self {
            shares: total_shares,
            avg_price,
        })
    }
}

/// A persisted position with display labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    pub id: PositionId,
    pub user_id: UserId,
    pub market_id: MarketId,
    pub market_title: String,
    pub outcome_id: OutcomeId,
    pub outcome_label: String,
    pub side: Side,
    pub shares: Decimal,
    pub avg_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn first_fill_sets_average() {
        let h = Holding::default().add(dec!(10), dec!(0.5)).unwrap();
        assert_eq!(h.shares, dec!(10));
        assert_eq!(h.avg_price, dec!(0.5));
    }

    #[test]
    fn subsequent_fill_is_share_weighted() {
        let h = Holding::default()
            .add(dec!(10), dec!(0.5))
            .and_then(|h| h.add(dec!(30), dec!(0.7)))
            .unwrap();
        assert_eq!(h.shares, dec!(40));
        // (5 + 21) / 40
        assert_eq!(h.avg_price, dec!(0.65));
    }

    #[test]
    fn identical_fills_keep_average() {
        let h = Holding::default()
            .add(dec!(10), dec!(0.5))
            .and_then(|h| h.add(dec!(10), dec!(0.5)))
            .unwrap();
        assert_eq!(h.shares, dec!(20));
        assert_eq!(h.avg_price, dec!(0.5));
    }

    #[test]
    fn average_rounds_to_eight_places() {
        let h = Holding::default()
            .add(dec!(1), dec!(0.1))
            .and_then(|h| h.add(dec!(2), dec!(0.2)))
            .unwrap();
        // 0.5 / 3
        assert_eq!(h.avg_price, dec!(0.16666667));
    }

    #[test]
    fn holding_cannot_outgrow_share_column() {
        let h = Holding::default()
            .add(dec!(600000000000), dec!(0.5))
            .unwrap();
        assert!(matches!(
            h.add(dec!(600000000000), dec!(0.5)),
            Err(DomainError::TooLarge { field: "position shares", .. })
        ));
    }

    #[test]
    fn side_parses() {
        assert_eq!("NO".parse::<Side>().unwrap(), Side::No);
        assert!("MAYBE".parse::<Side>().is_err());
    }
}
