use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{self, Manager, ManagerFields};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::{AppError, AppResult},
    extract::ApiJson,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/managers", get(list_managers).post(upsert_manager))
}

/// Creates a manager, or replaces the one named by `id`.
#[derive(Debug, Deserialize)]
pub struct UpsertManagerRequest {
    pub id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub father_name: Option<String>,
    pub telegram_url: Option<String>,
    pub whatsapp_url: Option<String>,
}

fn non_blank(field: &str, raw: &str) -> AppResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

impl UpsertManagerRequest {
    fn fields(&self) -> AppResult<ManagerFields> {
        Ok(ManagerFields {
            first_name: non_blank("first_name", &self.first_name)?,
            last_name: non_blank("last_name", &self.last_name)?,
            father_name: self.father_name.clone(),
            telegram_url: self.telegram_url.clone(),
            whatsapp_url: self.whatsapp_url.clone(),
        })
    }
}

#[instrument(skip(state))]
pub async fn list_managers(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> AppResult<Json<Vec<Manager>>> {
    Ok(Json(repo::list(&state.db).await?))
}

#[instrument(skip(state, payload))]
pub async fn upsert_manager(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(payload): ApiJson<UpsertManagerRequest>,
) -> AppResult<Json<Manager>> {
    let fields = payload.fields()?;
    let manager = match payload.id {
        Some(id) => repo::update(&state.db, id, &fields)
            .await?
            .ok_or_else(|| AppError::not_found("MANAGER_NOT_FOUND", "Manager not found"))?,
        None => repo::insert(&state.db, &fields).await?,
    };
    info!(manager_id = %manager.id, "manager saved");
    Ok(Json(manager))
}
