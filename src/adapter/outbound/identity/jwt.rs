//! HS256 bearer tokens from an external identity provider.
//!
//! Only the compact JWS form with `alg: HS256` is accepted. The token must
//! carry `exp` in the future, the configured audience, and non-empty `sub` and
//! `email` claims. A `role` of `admin` in `user_metadata` or `app_metadata`
//! marks the identity as an administrator.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::AccessError;
use crate::port::outbound::identity::ExternalTokenVerifier;
use crate::port::outbound::store::ExternalIdentity;

type HmacSha256 = Hmac<Sha256>;

/// Audience issued by hosted auth providers for signed-in users.
pub const DEFAULT_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    email: Option<String>,
    exp: Option<i64>,
    #[serde(default)]
    aud: Option<Value>,
    #[serde(default)]
    user_metadata: Option<Value>,
    #[serde(default)]
    app_metadata: Option<Value>,
}

impl Claims {
    fn has_audience(&self, expected: &str) -> bool {
        match &self.aud {
            Some(Value::String(aud)) => aud == expected,
            Some(Value::Array(list)) => list.iter().any(|v| v.as_str() == Some(expected)),
            _ => false,
        }
    }

    fn is_admin(&self) -> bool {
        [&self.user_metadata, &self.app_metadata]
            .into_iter()
            .flatten()
            .any(|meta| meta.get("role").and_then(Value::as_str) == Some("admin"))
    }
}

/// Verifier for HS256 tokens signed with a shared secret.
pub struct HsJwtVerifier {
    secret: Vec<u8>,
    audience: String,
}

impl HsJwtVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, audience: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            audience: audience.into(),
        }
    }

    fn fail(reason: &str) -> AccessError {
        AccessError::AuthenticationFailed(format!("invalid token: {reason}"))
    }

    fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AccessError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| Self::fail("malformed encoding"))?;
        serde_json::from_slice(&bytes).map_err(|_| Self::fail("malformed JSON"))
    }
}

impl ExternalTokenVerifier for HsJwtVerifier {
    fn verify(&self, token: &str) -> Result<ExternalIdentity, AccessError> {
        let (signing_input, signature) = token
            .rsplit_once('.')
            .ok_or_else(|| Self::fail("expected three segments"))?;
        let (header, payload) = signing_input
            .split_once('.')
            .filter(|(_, payload)| !payload.contains('.'))
            .ok_or_else(|| Self::fail("expected three segments"))?;

        let header: Header = Self::decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(Self::fail("unsupported algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Self::fail("malformed signature"))?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| Self::fail("unusable secret"))?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Self::fail("signature mismatch"))?;

        let claims: Claims = Self::decode_segment(payload)?;
        match claims.exp {
            Some(exp) if exp > Utc::now().timestamp() => {}
            Some(_) => return Err(AccessError::AuthenticationFailed("token has expired".into())),
            None => return Err(Self::fail("missing exp")),
        }
        if !claims.has_audience(&self.audience) {
            return Err(Self::fail("audience mismatch"));
        }

        let is_admin = claims.is_admin();
        let subject = claims.sub.filter(|s| !s.is_empty());
        let email = claims.email.filter(|e| !e.is_empty());
        match (subject, email) {
            (Some(subject), Some(email)) => Ok(ExternalIdentity {
                subject,
                email,
                is_admin,
            }),
            _ => Err(Self::fail("missing sub or email")),
        }
    }
}

/// Encode claims as an HS256 token. Used by tests and fixtures.
///
/// # Errors
/// Returns an error if the secret cannot key the MAC.
#[cfg(any(test, feature = "testkit"))]
pub fn sign_hs256(secret: &[u8], claims: &Value) -> Result<String, AccessError> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{header}.{payload}");
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| HsJwtVerifier::fail("unusable secret"))?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{signing_input}.{signature}"))
}
