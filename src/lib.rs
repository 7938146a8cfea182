//! Kastia - prediction market backend.
//!
//! Users trade YES/NO shares on market outcomes. Markets move from `OPEN` to
//! `RESOLVED` or `CANCELLED` exactly once; private markets are gated by
//! invite-only groups; every privileged transition lands in an append-only
//! audit log in the same transaction as the change itself.
//!
//! # Architecture
//!
//! - [`domain`] - Storage- and transport-agnostic types and invariants
//! - [`port`] - Outbound traits for persistence and identity
//! - [`application`] - Use cases and the authorization engine
//! - [`adapter`] - SQLite stores, identity providers, HTTP API and CLI
//! - [`infrastructure`] - Configuration, logging and wiring
//! - [`error`] - Error taxonomy shared by every layer

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
