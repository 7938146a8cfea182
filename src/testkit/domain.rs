//! Builders for domain primitives used across tests.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Market, MarketCategory, NewGroup, NewMarket, NewOutcome, OutcomeId, Privacy, Side, TradeOrder,
};

/// Market request with the given outcome labels, ending in a week.
///
/// # Panics
/// Panics if the title or labels are invalid.
#[must_use]
pub fn new_market(title: &str, labels: &[&str]) -> NewMarket {
    let outcomes = labels
        .iter()
        .map(|label| NewOutcome::try_new(*label, None).expect("valid outcome"))
        .collect();
    NewMarket::try_new(
        title,
        format!("Resolution criteria for {title}"),
        MarketCategory::Politics,
        Utc::now() + Duration::days(7),
        outcomes,
    )
    .expect("valid market")
}

/// Two-outcome `Yes`/`No` market request.
#[must_use]
pub fn binary_market(title: &str) -> NewMarket {
    new_market(title, &["Yes", "No"])
}

/// Outcome id by label.
///
/// # Panics
/// Panics if the market has no such outcome.
#[must_use]
pub fn outcome(market: &Market, label: &str) -> OutcomeId {
    market
        .outcomes
        .iter()
        .find(|o| o.label == label)
        .map(|o| o.id)
        .unwrap_or_else(|| panic!("market {} has no outcome {label}", market.id))
}

/// A `YES` order on `label`.
///
/// # Panics
/// Panics on invalid quantities.
#[must_use]
pub fn buy(market: &Market, label: &str, shares: Decimal, price: Decimal) -> TradeOrder {
    TradeOrder::try_new(market.id, outcome(market, label), Side::Yes, shares, price)
        .expect("valid order")
}

/// Group request with the given privacy.
///
/// # Panics
/// Panics on an invalid name.
#[must_use]
pub fn new_group(name: &str, privacy: Privacy) -> NewGroup {
    NewGroup::try_new(name, format!("{name} members"), "Research", privacy).expect("valid group")
}
