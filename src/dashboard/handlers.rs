use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::{
    dto::{DashboardResponse, WeeklyQuery},
    services,
};
use crate::{
    auth::extractors::AdminUser,
    error::AppResult,
    extract::ApiQuery,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard/weekly", get(weekly))
}

#[instrument(skip(state))]
pub async fn weekly(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(q): ApiQuery<WeeklyQuery>,
) -> AppResult<Json<DashboardResponse>> {
    let report = services::weekly(&state.db, &state.schedule, q.days).await?;
    Ok(Json(report))
}
