//! Audit log endpoint.

use axum::extract::{Query, State};
use axum::Json;

use super::dto::AuditQuery;
use super::extract::{AppState, Authenticated};
use crate::domain::{AuditEntry, AuditFilter};
use crate::error::Result;

pub async fn list(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>> {
    let filter = AuditFilter {
        action: query.action,
        user_id: query.user_id,
        limit: query.limit,
    };
    Ok(Json(state.audit.entries(&actor, filter).await?))
}
