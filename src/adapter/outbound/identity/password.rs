//! Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{Error, Result};
use crate::port::outbound::identity::PasswordHasher;

/// Argon2id hasher producing PHC strings.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hasher with the library's recommended cost parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Hasher with the cheapest parameters Argon2 accepts. Only for tests
    /// and fixtures.
    ///
    /// # Errors
    /// Returns an error if the parameters are rejected.
    pub fn fast() -> Result<Self> {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None)
            .map_err(|e| Error::Credential(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Credential(e.to_string()))
    }

    fn verify(&self, password: &str, stored_hash: &str) -> bool {
        // Parameters are read from the PHC string, not from `self`.
        PasswordHash::new(stored_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
