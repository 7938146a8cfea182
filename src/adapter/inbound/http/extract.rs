//! Request extractors: bearer authentication, client address and JSON bodies.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::domain::{Actor, DomainError};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::Services;

/// Shared state handed to every handler.
pub type AppState = Arc<Services>;

/// Accepts `Bearer <token>` and the legacy `Token <token>` scheme.
fn bearer_token(parts: &Parts) -> Result<Option<&str>> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| Error::authentication_failed("malformed authorization header"))?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Error::authentication_failed("malformed authorization header"))?;
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return Err(Error::authentication_failed("unsupported authorization scheme"));
    }
    Ok(Some(token.trim()))
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
pub fn client_ip(parts: &Parts) -> Option<String> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| header("x-real-ip").map(str::to_string))
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

/// An authenticated, non-banned caller.
pub struct Authenticated(pub Actor);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            Error::authentication_failed("authentication credentials were not provided")
        })?;
        let actor = state.accounts.authenticate(token, client_ip(parts)).await?;
        Ok(Self(actor))
    }
}

/// A caller that may be anonymous. A token that is present must still be valid.
pub struct MaybeAuthenticated(pub Option<Actor>);

impl FromRequestParts<AppState> for MaybeAuthenticated {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match bearer_token(parts)? {
            None => Ok(Self(None)),
            Some(token) => {
                let actor = state.accounts.authenticate(token, client_ip(parts)).await?;
                Ok(Self(Some(actor)))
            }
        }
    }
}

fn invalid_body(reason: impl Into<String>) -> Error {
    DomainError::InvalidValue {
        field: "body",
        reason: reason.into(),
    }
    .into()
}

/// JSON body whose rejections use the crate's error format.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(invalid_body(rejection.body_text())),
        }
    }
}

/// Parse an optional JSON body; an empty body yields the default.
///
/// # Errors
/// A validation error for malformed JSON.
pub fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| invalid_body(e.to_string()))
}
