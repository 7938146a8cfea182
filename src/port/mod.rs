//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Application services are generic over these traits so that the SQLite
//! adapters can be swapped for test doubles.

pub mod outbound;
