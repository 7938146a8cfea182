//! Group endpoints.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{
    AccessRequestBody, AddAdminRequest, CreateGroupRequest, DecideRequest, DecisionResponse,
    GroupDetailResponse, GroupMarketRequest, MessageResponse,
};
use super::extract::{optional_body, ApiJson, AppState, Authenticated, MaybeAuthenticated};
use crate::domain::{AccessRequest, Group, GroupId, GroupMarket, Roster};
use crate::error::Result;

pub async fn list(
    State(state): State<AppState>,
    MaybeAuthenticated(actor): MaybeAuthenticated,
) -> Result<Json<Vec<Group>>> {
    Ok(Json(state.groups.list(actor.as_ref()).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>)> {
    let group = state.groups.create(&actor, body.into_domain()?).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn detail(
    State(state): State<AppState>,
    MaybeAuthenticated(actor): MaybeAuthenticated,
    Path(id): Path<GroupId>,
) -> Result<Json<GroupDetailResponse>> {
    let view = state.groups.detail(id, actor.as_ref()).await?;
    Ok(Json(view.into()))
}

pub async fn request_access(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccessRequest>)> {
    let body: AccessRequestBody = optional_body(&body)?;
    let request = state.groups.request_access(id, &actor, body.message).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn approve_access(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
    ApiJson(body): ApiJson<DecideRequest>,
) -> Result<Json<DecisionResponse>> {
    let outcome = state.groups.approve(id, body.request_id, &actor).await?;
    Ok(Json(outcome.into()))
}

pub async fn deny_access(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
    ApiJson(body): ApiJson<DecideRequest>,
) -> Result<Json<DecisionResponse>> {
    let outcome = state.groups.deny(id, body.request_id, &actor).await?;
    Ok(Json(outcome.into()))
}

pub async fn access_requests(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
) -> Result<Json<Vec<AccessRequest>>> {
    Ok(Json(state.groups.pending_requests(id, &actor).await?))
}

pub async fn add_market(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
    ApiJson(body): ApiJson<GroupMarketRequest>,
) -> Result<(StatusCode, Json<GroupMarket>)> {
    let link = state.groups.add_market(id, body.market_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn remove_market(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
    ApiJson(body): ApiJson<GroupMarketRequest>,
) -> Result<Json<MessageResponse>> {
    state.groups.remove_market(id, body.market_id, &actor).await?;
    Ok(Json(MessageResponse::new(format!(
        "Market {} removed from group",
        body.market_id
    ))))
}

pub async fn add_admin(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<GroupId>,
    ApiJson(body): ApiJson<AddAdminRequest>,
) -> Result<Json<Roster>> {
    Ok(Json(state.groups.add_admin(id, body.user_id, &actor).await?))
}
