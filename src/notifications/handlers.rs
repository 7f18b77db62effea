use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo::{self, Notification};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{ApiPath, ApiQuery},
    pagination::{Page, PageQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_read))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> AppResult<Json<Page<Notification>>> {
    let request = q.newest_first()?;
    let rows = repo::list_for_user(&state.db, caller.id, &request).await?;
    Ok(Json(Page::from_rows(rows, &request)?))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiPath(notification_id): ApiPath<Uuid>,
) -> AppResult<Json<Notification>> {
    let row = repo::mark_read(&state.db, caller.id, notification_id)
        .await?
        .ok_or_else(|| AppError::not_found("NOTIFICATION_NOT_FOUND", "Notification not found"))?;
    info!(notification_id = %row.id, "notification read");
    Ok(Json(row))
}
