use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{info, instrument, warn};

use super::{
    dto::CreateStudentRequest,
    repo::{self, Student},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::ApiJson,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/students", get(list_students).post(create_student))
}

#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<Vec<Student>>> {
    Ok(Json(repo::list_for_parent(&state.db, caller.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_student(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<Student>)> {
    let new = payload.into_new_student(caller.id)?;
    if !state.store.group_exists(new.group_id).await? {
        warn!(group_id = %new.group_id, "student for unknown group");
        return Err(AppError::not_found("GROUP_NOT_FOUND", "Group not found"));
    }
    let student = repo::insert(&state.db, &new).await?;
    info!(student_id = %student.id, parent_id = %caller.id, "student created");
    Ok((StatusCode::CREATED, Json(student)))
}
