use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::extractors::AdminUser,
    error::AppResult,
    extract::ApiQuery,
    lessons::generator::{GenerationReport, LessonGenerator, DEFAULT_HORIZON_DAYS},
    notifications::{repo as notifications_repo, services::ReminderWindow},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/jobs/generate-lessons", post(generate_lessons))
        .route("/admin/jobs/enqueue-reminders", post(enqueue_reminders))
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    DEFAULT_HORIZON_DAYS
}

#[derive(Debug, Serialize)]
pub struct EnqueueReport {
    pub created: u64,
}

#[instrument(skip(state))]
pub async fn generate_lessons(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(q): ApiQuery<GenerateQuery>,
) -> AppResult<Json<GenerationReport>> {
    let generator = LessonGenerator::new(state.store.clone(), state.schedule.clone());
    let report = generator.generate(q.days).await?;
    info!(admin_id = %admin.id, created = report.created, "generate-lessons job done");
    Ok(Json(report))
}

#[instrument(skip(state))]
pub async fn enqueue_reminders(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<EnqueueReport>> {
    let now = OffsetDateTime::now_utc();
    let window = ReminderWindow::around(now, state.config.reminder_window_hours);
    let created =
        notifications_repo::enqueue_lesson_reminders(&state.db, window.from, window.to, now).await?;
    info!(admin_id = %admin.id, created, from = %window.from, to = %window.to, "reminders enqueued");
    Ok(Json(EnqueueReport { created }))
}
