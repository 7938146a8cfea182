//! Market endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{CancelRequest, CreateMarketRequest, MarketQuery, MarketResponse, ResolveRequest};
use super::extract::{optional_body, ApiJson, AppState, Authenticated, MaybeAuthenticated};
use crate::domain::{MarketFilter, MarketId};
use crate::error::Result;

pub async fn list(
    State(state): State<AppState>,
    MaybeAuthenticated(actor): MaybeAuthenticated,
    Query(query): Query<MarketQuery>,
) -> Result<Json<Vec<MarketResponse>>> {
    let filter = MarketFilter {
        status: query.status,
        category: query.category,
    };
    let markets = state.markets.list(filter, actor.as_ref()).await?;
    Ok(Json(markets.into_iter().map(MarketResponse::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<CreateMarketRequest>,
) -> Result<(StatusCode, Json<MarketResponse>)> {
    let market = state.markets.create(&actor, body.into_domain()?).await?;
    Ok((StatusCode::CREATED, Json(market.into())))
}

pub async fn get(
    State(state): State<AppState>,
    MaybeAuthenticated(actor): MaybeAuthenticated,
    Path(id): Path<MarketId>,
) -> Result<Json<MarketResponse>> {
    let market = state.markets.get(id, actor.as_ref()).await?;
    Ok(Json(market.into()))
}

pub async fn resolve(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<MarketId>,
    ApiJson(body): ApiJson<ResolveRequest>,
) -> Result<Json<MarketResponse>> {
    let market = state.markets.resolve(id, body.winner_id, &actor).await?;
    Ok(Json(market.into()))
}

pub async fn cancel(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<MarketId>,
    body: Bytes,
) -> Result<Json<MarketResponse>> {
    let body: CancelRequest = optional_body(&body)?;
    let market = state.markets.cancel(id, &actor, body.reason).await?;
    Ok(Json(market.into()))
}
