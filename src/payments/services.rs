use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    dto::{CreatePaymentRequest, WebhookRequest},
    repo::{self, NewPayment, Payment},
};
use crate::{
    error::{AppError, AppResult},
    lessons::attendance::check_enrollment,
    scope::Caller,
    store::ScheduleStore,
};

/// Opens a pending payment for a lesson of one of the caller's students.
pub async fn create(
    db: &PgPool,
    store: &dyn ScheduleStore,
    caller: &Caller,
    req: CreatePaymentRequest,
) -> AppResult<Payment> {
    req.validate()?;
    let enrollment = check_enrollment(store, caller, req.lesson_id, req.student_id).await?;

    let new = NewPayment {
        parent_user_id: caller.id,
        student_id: enrollment.student.id,
        group_id: enrollment.student.group_id,
        lesson_id: enrollment.lesson.id,
        amount_cents: req.amount_cents,
        currency: req.currency_code(),
        provider: req.provider,
        provider_payment_id: req.provider_payment_id,
    };
    let payment = repo::insert(db, &new).await?;
    info!(payment_id = %payment.id, user_id = %caller.id, amount_cents = payment.amount_cents, "payment created");
    Ok(payment)
}

pub async fn handle_webhook(db: &PgPool, provider: &str, req: &WebhookRequest) -> AppResult<Payment> {
    let status = req.status.as_str();
    match repo::apply_provider_status(db, provider, &req.provider_payment_id, status).await? {
        Some(payment) => {
            info!(payment_id = %payment.id, provider, status, "payment status updated");
            Ok(payment)
        }
        None => {
            warn!(provider, provider_payment_id = %req.provider_payment_id, "webhook for unknown payment");
            Err(AppError::not_found("PAYMENT_NOT_FOUND", "Payment not found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scope::Role,
        state::AppState,
        store::memory::MemoryStore,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use time::macros::datetime;
    use uuid::Uuid;

    fn request(student_id: Uuid, lesson_id: Uuid) -> CreatePaymentRequest {
        serde_json::from_value(json!({
            "amount_cents": 1500,
            "student_id": student_id,
            "lesson_id": lesson_id,
        }))
        .unwrap()
    }

    // Every rejection below happens before the pool is touched.
    #[tokio::test]
    async fn create_runs_enrollment_checks_in_order() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::fake_with(store.clone());
        let parent = Caller::new(Uuid::new_v4(), Role::Parent);
        let group = store.add_group(None, json!([]), true).await;
        let other_group = store.add_group(None, json!([]), true).await;
        let child = store.add_student(parent.id, group).await;
        let stranger_child = store.add_student(Uuid::new_v4(), group).await;
        let foreign_lesson = store
            .add_lesson(other_group, datetime!(2026-10-20 08:00 UTC))
            .await;

        let err = create(&state.db, store.as_ref(), &parent, request(stranger_child, foreign_lesson.id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = create(&state.db, store.as_ref(), &parent, request(child, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LESSON_NOT_FOUND");

        let err = create(&state.db, store.as_ref(), &parent, request(child, foreign_lesson.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LESSON_NOT_IN_CHILD_GROUP");
    }

    #[tokio::test]
    async fn create_validates_amount_first() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::fake_with(store.clone());
        let parent = Caller::new(Uuid::new_v4(), Role::Parent);
        let mut req = request(Uuid::new_v4(), Uuid::new_v4());
        req.amount_cents = 0;
        let err = create(&state.db, store.as_ref(), &parent, req).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
