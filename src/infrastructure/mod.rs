//! Infrastructure layer.
//!
//! Configuration, logging and the composition root that wires adapters into
//! application services.

pub mod bootstrap;
pub mod config;
