use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CheckUserResponse, Identity, LoginRequest, RefreshRequest, RegisterParentRequest, TokenResponse},
    extractors::AuthUser,
    jwt::JwtKeys,
    repo::{Course, User},
    services,
};
use crate::{error::AppResult, extract::ApiJson, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register-parent", post(register_parent))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/check-user", post(check_user))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/courses", get(my_courses))
}

#[instrument(skip(state, payload))]
pub async fn register_parent(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterParentRequest>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let tokens = services::register_parent(&state.db, &keys, payload).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(services::login(&state.db, &keys, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(
        services::refresh(&state.db, &keys, &payload.refresh_token).await?,
    ))
}

#[instrument(skip(state))]
pub async fn check_user(
    State(state): State<AppState>,
    ApiJson(identity): ApiJson<Identity>,
) -> AppResult<Json<CheckUserResponse>> {
    Ok(Json(services::check_user(&state.db, &identity).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<User>> {
    Ok(Json(services::me(&state.db, &caller).await?))
}

#[instrument(skip(state))]
pub async fn my_courses(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<Vec<Course>>> {
    Ok(Json(services::courses(&state.db, &caller).await?))
}
