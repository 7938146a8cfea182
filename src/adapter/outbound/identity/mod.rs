//! Credential adapters: password hashing and external bearer tokens.

pub mod jwt;
pub mod password;

pub use jwt::HsJwtVerifier;
pub use password::Argon2Hasher;
