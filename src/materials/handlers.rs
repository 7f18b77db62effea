use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateMaterialRequest, MaterialShort, MaterialsQuery},
    repo::Material,
    services,
};
use crate::{
    auth::extractors::{AdminUser, AuthUser},
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::Page,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/materials", get(list_materials).post(create_material))
        .route("/materials/short", get(list_materials_short))
        .route("/materials/:id", get(get_material))
}

#[instrument(skip(state))]
pub async fn list_materials(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<MaterialsQuery>,
) -> AppResult<Json<Page<Material>>> {
    let page = services::list(&state.db, state.store.as_ref(), &caller, &q).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn list_materials_short(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<MaterialsQuery>,
) -> AppResult<Json<Page<MaterialShort>>> {
    let page = services::list(&state.db, state.store.as_ref(), &caller, &q).await?;
    Ok(Json(page.map(MaterialShort::from)))
}

#[instrument(skip(state))]
pub async fn get_material(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(material_id): ApiPath<Uuid>,
) -> AppResult<Json<Material>> {
    let material = services::get(&state.db, state.store.as_ref(), &caller, material_id).await?;
    Ok(Json(material))
}

#[instrument(skip(state, payload))]
pub async fn create_material(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(payload): ApiJson<CreateMaterialRequest>,
) -> AppResult<(StatusCode, Json<Material>)> {
    let material = services::create(&state.db, state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(material)))
}
