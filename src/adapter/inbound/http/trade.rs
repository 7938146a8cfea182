//! Trading and position endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::dto::TradeRequest;
use super::extract::{ApiJson, AppState, Authenticated};
use crate::domain::{Position, Trade};
use crate::error::Result;

pub async fn positions(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<Json<Vec<Position>>> {
    Ok(Json(state.ledger.positions(&actor).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<Json<Vec<Trade>>> {
    Ok(Json(state.ledger.trades(&actor).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<TradeRequest>,
) -> Result<(StatusCode, Json<Trade>)> {
    let trade = state.ledger.record_trade(&actor, body.into_order()?).await?;
    Ok((StatusCode::CREATED, Json(trade)))
}
