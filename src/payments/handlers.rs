use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreatePaymentRequest, WebhookRequest, WebhookResponse},
    repo::{self, Payment},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::{Page, PageQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/create", post(create_payment))
        .route("/payments/webhook/:provider", post(webhook))
}

#[instrument(skip(state, payload))]
pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(payload): ApiJson<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let payment = services::create(&state.db, state.store.as_ref(), &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[instrument(skip(state))]
pub async fn webhook(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiJson(payload): ApiJson<WebhookRequest>,
) -> AppResult<Json<WebhookResponse>> {
    let payment = services::handle_webhook(&state.db, &provider, &payload).await?;
    Ok(Json(WebhookResponse {
        id: payment.id,
        status: payment.status,
    }))
}

#[instrument(skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiQuery(q): ApiQuery<PageQuery>,
) -> AppResult<Json<Page<Payment>>> {
    let request = q.newest_first()?;
    let rows = repo::list_for_parent(&state.db, caller.id, &request).await?;
    Ok(Json(Page::from_rows(rows, &request)?))
}
