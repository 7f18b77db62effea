use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    attendance,
    dto::{
        CreateLessonRequest, LessonDetail, LessonPatch, ListQuery, MonthQuery, RangeQuery,
        WillGoRequest, WillGoResponse,
    },
    repo::Lesson,
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
        .route("/lessons", get(list_lessons).post(create_lesson))
        .route("/lessons/month", get(list_month))
        .route("/lessons/range", get(list_range))
        .route("/lessons/:id", get(get_lesson).patch(update_lesson))
        .route("/lessons/:id/will-go", post(will_go))
}

#[instrument(skip(state))]
pub async fn list_lessons(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> AppResult<Json<Page<Lesson>>> {
    let page = services::list_feed(state.store.as_ref(), &caller, &q).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn list_month(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<MonthQuery>,
) -> AppResult<Json<Page<Lesson>>> {
    let page = services::list_month(state.store.as_ref(), &state.schedule, &caller, &q).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn list_range(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<RangeQuery>,
) -> AppResult<Json<Page<Lesson>>> {
    let page = services::list_range(state.store.as_ref(), &state.schedule, &caller, &q).await?;
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_lesson(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(lesson_id): ApiPath<Uuid>,
) -> AppResult<Json<LessonDetail>> {
    let lesson = services::get_for_caller(state.store.as_ref(), &caller, lesson_id).await?;
    Ok(Json(lesson.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(payload): ApiJson<CreateLessonRequest>,
) -> AppResult<(StatusCode, Json<Lesson>)> {
    let lesson = services::create(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[instrument(skip(state, patch))]
pub async fn update_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiPath(lesson_id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<LessonPatch>,
) -> AppResult<Json<Lesson>> {
    let lesson = services::update(state.store.as_ref(), lesson_id, &patch).await?;
    Ok(Json(lesson))
}

#[instrument(skip(state))]
pub async fn will_go(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(lesson_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<WillGoRequest>,
) -> AppResult<Json<WillGoResponse>> {
    let row = attendance::upsert_will_go(
        state.store.as_ref(),
        &caller,
        lesson_id,
        body.student_id,
        body.will_go,
    )
    .await?;
    Ok(Json(row.into()))
}
