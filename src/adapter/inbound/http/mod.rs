//! HTTP API.
//!
//! Routes are thin: each handler extracts the caller and body, calls one
//! application service and maps the result. Errors render through
//! [`error`].

pub mod audit;
pub mod dto;
pub mod error;
pub mod extract;
pub mod group;
pub mod market;
pub mod trade;
pub mod user;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::Result;
use crate::infrastructure::bootstrap::Services;
use extract::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the application router.
pub fn router(services: Services) -> Router {
    let state: AppState = Arc::new(services);
    Router::new()
        .route("/health", get(health))
        .route("/markets", get(market::list).post(market::create))
        .route("/markets/{id}", get(market::get))
        .route("/markets/{id}/resolve", post(market::resolve))
        .route("/markets/{id}/cancel", post(market::cancel))
        .route("/positions", get(trade::positions))
        .route("/trades", get(trade::list).post(trade::create))
        .route("/groups", get(group::list).post(group::create))
        .route("/groups/{id}", get(group::detail))
        .route("/groups/{id}/request_access", post(group::request_access))
        .route("/groups/{id}/approve_access", post(group::approve_access))
        .route("/groups/{id}/deny_access", post(group::deny_access))
        .route("/groups/{id}/access_requests", get(group::access_requests))
        .route("/groups/{id}/add_market", post(group::add_market))
        .route("/groups/{id}/remove_market", post(group::remove_market))
        .route("/groups/{id}/add_admin", post(group::add_admin))
        .route("/users/me", get(user::me))
        .route("/users/{id}/ban", post(user::ban))
        .route("/users/{id}/unban", post(user::unban))
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route("/change-password", post(user::change_password))
        .route("/audit-logs", get(audit::list))
        .with_state(state)
}

/// Serve the API on an already bound listener until `shutdown` resolves.
///
/// # Errors
/// Returns an I/O error if the server fails.
pub async fn serve_on<F>(listener: TcpListener, services: Services, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(
        listener,
        router(services).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    info!("HTTP server stopped");
    Ok(())
}

/// Bind `addr` and serve until `shutdown` resolves.
///
/// # Errors
/// Returns an I/O error if binding or serving fails.
pub async fn serve<F>(addr: SocketAddr, services: Services, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, services, shutdown).await
}
