//! Registration, login and user moderation endpoints.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{
    BanRequest, BanResponse, ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse,
    RegisterRequest, UserResponse,
};
use super::extract::{optional_body, ApiJson, AppState, Authenticated};
use crate::domain::UserId;
use crate::error::Result;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let account = state
        .accounts
        .register(&body.username, &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let session = state.accounts.login(&body.username, &body.password).await?;
    Ok(Json(session.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .accounts
        .change_password(&actor, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

pub async fn me(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<Json<UserResponse>> {
    Ok(Json(state.accounts.me(&actor).await?.into()))
}

pub async fn ban(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<UserId>,
    body: Bytes,
) -> Result<Json<BanResponse>> {
    let body: BanRequest = optional_body(&body)?;
    let profile = state.accounts.ban(&actor, id, body.reason).await?;
    Ok(Json(BanResponse {
        user_id: id,
        profile: profile.into(),
    }))
}

pub async fn unban(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<UserId>,
) -> Result<Json<BanResponse>> {
    let profile = state.accounts.unban(&actor, id).await?;
    Ok(Json(BanResponse {
        user_id: id,
        profile: profile.into(),
    }))
}
