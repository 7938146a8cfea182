//! Credential and external-token ports.

use crate::error::{AccessError, Result};
use crate::port::outbound::store::ExternalIdentity;

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage.
    ///
    /// # Errors
    /// Returns an error if the underlying hasher fails.
    fn hash(&self, password: &str) -> Result<String>;

    /// Check a plaintext password against a stored hash.
    fn verify(&self, password: &str, stored_hash: &str) -> bool;
}

/// Verifier for tokens issued by an external identity provider.
pub trait ExternalTokenVerifier: Send + Sync {
    /// Verify signature, audience and expiry and extract the identity.
    ///
    /// # Errors
    /// Returns [`AccessError::AuthenticationFailed`] for expired or invalid tokens.
    fn verify(&self, token: &str) -> std::result::Result<ExternalIdentity, AccessError>;
}
