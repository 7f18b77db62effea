use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateGroupRequest, GroupPatch},
    repo::{self, Group},
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:id", patch(update_group))
}

fn group_not_found() -> AppError {
    AppError::not_found("GROUP_NOT_FOUND", "Group not found")
}

#[instrument(skip(state))]
pub async fn list_groups(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> AppResult<Json<Vec<Group>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_group(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(payload): ApiJson<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<Group>)> {
    let new = payload.into_new_group()?;
    let group = repo::insert(&state.db, &new).await?;
    info!(group_id = %group.id, admin_id = %admin.id, "group created");
    Ok((StatusCode::CREATED, Json(group)))
}

#[instrument(skip(state, patch))]
pub async fn update_group(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<GroupPatch>,
) -> AppResult<Json<Group>> {
    let current = repo::find(&state.db, group_id)
        .await?
        .ok_or_else(group_not_found)?;
    let next = patch.apply(&current)?;
    let saved = repo::update(&state.db, &next)
        .await?
        .ok_or_else(group_not_found)?;
    Ok(Json(saved))
}
