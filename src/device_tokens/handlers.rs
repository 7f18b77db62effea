use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{self, DeviceToken, RevokedToken};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/device-tokens", post(register_token))
        .route("/device-tokens/:id", delete(revoke_token))
}

#[derive(Debug, Deserialize)]
pub struct RegisterTokenRequest {
    pub token: String,
    pub platform: Option<String>,
}

impl RegisterTokenRequest {
    fn normalized(&self) -> AppResult<(&str, Option<&str>)> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(AppError::validation("token must not be empty"));
        }
        let platform = self.platform.as_deref().map(str::trim).filter(|p| !p.is_empty());
        Ok((token, platform))
    }
}

#[instrument(skip(state, payload))]
pub async fn register_token(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<RegisterTokenRequest>,
) -> AppResult<(StatusCode, Json<DeviceToken>)> {
    let (token, platform) = payload.normalized()?;
    let row = repo::upsert(&state.db, caller.id, token, platform).await?;
    info!(user_id = %caller.id, token_id = %row.id, "device token registered");
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state))]
pub async fn revoke_token(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(token_id): ApiPath<Uuid>,
) -> AppResult<Json<RevokedToken>> {
    let row = repo::revoke(&state.db, caller.id, token_id)
        .await?
        .ok_or_else(|| AppError::not_found("DEVICE_TOKEN_NOT_FOUND", "Device token not found"))?;
    Ok(Json(row))
}
