//! Domain validation errors.
//!
//! This module defines errors raised when caller input violates a domain
//! invariant. They are returned by the `try_new` constructors and by the
//! validating methods on domain types, before anything touches storage.
//!
//! # Examples
//!
//! ```
//! use kastia::domain::error::DomainError;
//! use kastia::domain::market::{MarketCategory, NewMarket};
//! use chrono::Utc;
//!
//! let result = NewMarket::try_new(
//!     "Will it rain tomorrow?",
//!     "Resolves YES if it rains.",
//!     MarketCategory::Trending,
//!     Utc::now(),
//!     vec![],
//! );
//!
//! assert!(matches!(result, Err(DomainError::EmptyOutcomes)));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A required field was absent or blank.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A text field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length in characters.
        max: usize,
    },

    /// Markets must have at least one outcome.
    #[error("outcomes cannot be empty")]
    EmptyOutcomes,

    /// Outcome probability outside 0..=100.
    #[error("probability must be between 0 and 100, got {probability}")]
    ProbabilityOutOfRange {
        /// The rejected probability.
        probability: f64,
    },

    /// Trade shares must be strictly positive.
    #[error("shares must be positive, got {shares}")]
    NonPositiveShares {
        /// The rejected share count.
        shares: Decimal,
    },

    /// Shares carry at most eight decimal places.
    #[error("shares support at most 8 decimal places, got {shares}")]
    SharesPrecision {
        /// The rejected share count.
        shares: Decimal,
    },

    /// Trade price must be strictly positive.
    #[error("price must be positive, got {price}")]
    NonPositivePrice {
        /// The rejected price.
        price: Decimal,
    },

    /// A quantity reached the ledger's upper bound.
    #[error("{field} must be less than {max}")]
    TooLarge {
        /// Name of the offending quantity.
        field: &'static str,
        /// Exclusive upper bound.
        max: Decimal,
    },

    /// The referenced outcome is not part of the market.
    #[error("outcome {outcome_id} does not belong to market {market_id}")]
    ForeignOutcome {
        /// The market being acted on.
        market_id: i32,
        /// The outcome that was supplied.
        outcome_id: i32,
    },

    /// An enumerated value could not be parsed.
    #[error("unknown {field} value '{value}'")]
    UnknownVariant {
        /// Name of the enumerated field.
        field: &'static str,
        /// The unrecognised input.
        value: String,
    },

    /// Generic invalid value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl DomainError {
    pub(crate) fn unknown(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            field,
            value: value.into(),
        }
    }
}
