//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for markets, orders and groups.
//! - [`world`] - A migrated temporary database with wired services and
//!   helpers for creating users with particular rights.

pub mod domain;
pub mod world;

pub use world::TestWorld;
