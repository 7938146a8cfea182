//! Market-related domain types.
//!
//! - [`Market`] - A tradable proposition with one or more outcomes
//! - [`Outcome`] - A single possible resolution of a market
//! - [`MarketState`] - Lifecycle state carrying the data each state owns
//! - [`NewMarket`] - Validated creation request
//!
//! The lifecycle is `OPEN → RESOLVED` or `OPEN → CANCELLED`; both targets are
//! terminal. A resolved market always knows its winner and its resolver
//! because those live inside [`MarketState::Resolved`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OutcomeId, UserId};

const MAX_TITLE_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 100;
const DEFAULT_PROBABILITY: f64 = 50.0;

/// Market status as stored and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketStatus {
    Open,
    Resolved,
    Cancelled,
}

impl MarketStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Resolved => "RESOLVED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "RESOLVED" => Ok(Self::Resolved),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(DomainError::unknown("status", other)),
        }
    }
}

/// Market listing category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketCategory {
    #[default]
    Trending,
    Breaking,
    New,
    Politics,
    Sports,
    Finance,
    Crypto,
    Tech,
    Culture,
}

impl MarketCategory {
    pub const ALL: [MarketCategory; 9] = [
        Self::Trending,
        Self::Breaking,
        Self::New,
        Self::Politics,
        Self::Sports,
        Self::Finance,
        Self::Crypto,
        Self::Tech,
        Self::Culture,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trending => "Trending",
            Self::Breaking => "Breaking",
            Self::New => "New",
            Self::Politics => "Politics",
            Self::Sports => "Sports",
            Self::Finance => "Finance",
            Self::Crypto => "Crypto",
            Self::Tech => "Tech",
            Self::Culture => "Culture",
        }
    }
}

impl FromStr for MarketCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::unknown("category", s))
    }
}

/// Lifecycle state with the data owned by each state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketState {
    Open,
    Resolved {
        winner: OutcomeId,
        resolved_by: UserId,
    },
    Cancelled,
}

impl MarketState {
    #[must_use]
    pub const fn status(&self) -> MarketStatus {
        match self {
            Self::Open => MarketStatus::Open,
            Self::Resolved { .. } => MarketStatus::Resolved,
            Self::Cancelled => MarketStatus::Cancelled,
        }
    }
}

/// A single outcome within a market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub id: OutcomeId,
    pub market_id: MarketId,
    pub label: String,
    /// Implied probability, 0-100.
    pub probability: f64,
}

/// A persisted market with its outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub id: MarketId,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: MarketCategory,
    pub volume: Decimal,
    pub change_24h: f64,
    pub end_date: DateTime<Utc>,
    pub state: MarketState,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub outcomes: Vec<Outcome>,
}

impl Market {
    #[must_use]
    pub const fn status(&self) -> MarketStatus {
        self.state.status()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, MarketState::Open)
    }

    /// Winning outcome, set only once resolved.
    #[must_use]
    pub const fn winner(&self) -> Option<OutcomeId> {
        match self.state {
            MarketState::Resolved { winner, .. } => Some(winner),
            _ => None,
        }
    }

    /// Resolver, set only once resolved.
    #[must_use]
    pub const fn resolved_by(&self) -> Option<UserId> {
        match self.state {
            MarketState::Resolved { resolved_by, .. } => Some(resolved_by),
            _ => None,
        }
    }

    #[must_use]
    pub fn outcome(&self, id: OutcomeId) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    /// Check that `outcome_id` names one of this market's outcomes.
    ///
    /// # Errors
    /// Returns [`DomainError::ForeignOutcome`] otherwise.
    pub fn require_outcome(&self, outcome_id: OutcomeId) -> Result<&Outcome, DomainError> {
        self.outcome(outcome_id)
            .ok_or(DomainError::ForeignOutcome {
                market_id: self.id.value(),
                outcome_id: outcome_id.value(),
            })
    }

    /// Human-readable audit target.
    #[must_use]
    pub fn audit_target(&self) -> String {
        format!("Market: {} - {}", self.id, self.title)
    }
}

/// Outcome supplied when creating a market.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutcome {
    pub label: String,
    pub probability: f64,
}

impl NewOutcome {
    /// Validate an outcome; a missing probability defaults to 50.
    ///
    /// # Errors
    /// Returns [`DomainError`] for a blank or overlong label or a probability
    /// outside 0..=100.
    pub fn try_new(label: impl Into<String>, probability: Option<f64>) -> Result<Self, DomainError> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(DomainError::MissingField { field: "label" });
        }
        if label.chars().count() > MAX_LABEL_LEN {
            return Err(DomainError::TooLong {
                field: "label",
                max: MAX_LABEL_LEN,
            });
        }
        let probability = probability.unwrap_or(DEFAULT_PROBABILITY);
        if !(0.0..=100.0).contains(&probability) {
            return Err(DomainError::ProbabilityOutOfRange { probability });
        }
        Ok(Self { label, probability })
    }
}

/// Validated request to create a market.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: MarketCategory,
    pub end_date: DateTime<Utc>,
    pub outcomes: Vec<NewOutcome>,
}

impl NewMarket {
    /// Create a market request with domain invariant validation.
    ///
    /// # Domain Invariants
    ///
    /// - `title` must be non-blank and at most 255 characters
    /// - `outcomes` must not be empty
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if any invariant is violated.
    pub fn try_new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: MarketCategory,
        end_date: DateTime<Utc>,
        outcomes: Vec<NewOutcome>,
    ) -> Result<Self, DomainError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::MissingField { field: "title" });
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::TooLong {
                field: "title",
                max: MAX_TITLE_LEN,
            });
        }
        if outcomes.is_empty() {
            return Err(DomainError::EmptyOutcomes);
        }

        Ok(Self {
            title,
            description: description.into(),
            image_url: None,
            category,
            end_date,
            outcomes,
        })
    }

    #[must_use]
    pub fn with_image_url(mut self, url: Option<String>) -> Self {
        self.image_url = url.filter(|u| !u.trim().is_empty());
        self
    }
}

/// Listing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketFilter {
    pub status: Option<MarketStatus>,
    pub category: Option<MarketCategory>,
}
