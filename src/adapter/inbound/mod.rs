//! Inbound adapters: HTTP API and command line.

pub mod cli;
pub mod http;
