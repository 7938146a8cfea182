//! Domain identifier types with proper encapsulation.
//!
//! Every persisted entity is keyed by a database-assigned integer. Each kind
//! of key gets its own newtype so a market id can never be passed where a
//! user id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw database key.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the raw database key.
            #[must_use]
            pub const fn value(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// User identifier.
    UserId
);
entity_id!(
    /// Market identifier.
    MarketId
);
entity_id!(
    /// Outcome identifier, unique across all markets.
    OutcomeId
);
entity_id!(
    /// Position identifier.
    PositionId
);
entity_id!(
    /// Trade identifier.
    TradeId
);
entity_id!(
    /// Group identifier.
    GroupId
);
entity_id!(
    /// Group access request identifier.
    AccessRequestId
);
entity_id!(
    /// Audit log entry identifier.
    AuditLogId
);
