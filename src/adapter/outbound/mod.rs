//! Outbound adapters (driven side).

pub mod identity;
pub mod sqlite;
