use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::pagination::{Keyed, PageRequest, Position};

const PAYMENT_COLUMNS: &str = "id, parent_user_id, student_id, group_id, lesson_id, amount_cents, \
     currency, provider, provider_payment_id, status, created_at, paid_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub parent_user_id: Uuid,
    pub student_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub amount_cents: i32,
    pub currency: String,
    pub provider: Option<String>,
    pub provider_payment_id: Option<String>,
    pub status: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
}

impl Keyed for Payment {
    fn position(&self) -> Position {
        Position::new(self.created_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub parent_user_id: Uuid,
    pub student_id: Uuid,
    pub group_id: Uuid,
    pub lesson_id: Uuid,
    pub amount_cents: i32,
    pub currency: String,
    pub provider: Option<String>,
    pub provider_payment_id: Option<String>,
}

pub async fn insert(db: &PgPool, payment: &NewPayment) -> anyhow::Result<Payment> {
    let sql = format!(
        "INSERT INTO payments (parent_user_id, student_id, group_id, lesson_id, amount_cents, \
         currency, provider, provider_payment_id, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending') RETURNING {PAYMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(payment.parent_user_id)
        .bind(payment.student_id)
        .bind(payment.group_id)
        .bind(payment.lesson_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(&payment.provider)
        .bind(&payment.provider_payment_id)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Applies a provider status update; `paid_at` is stamped on transition to paid.
pub async fn apply_provider_status(
    db: &PgPool,
    provider: &str,
    provider_payment_id: &str,
    status: &str,
) -> anyhow::Result<Option<Payment>> {
    let sql = format!(
        "UPDATE payments SET status = $3, \
         paid_at = CASE WHEN $3 = 'paid' THEN now() ELSE paid_at END \
         WHERE provider = $1 AND provider_payment_id = $2 RETURNING {PAYMENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(provider)
        .bind(provider_payment_id)
        .bind(status)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn list_for_parent(
    db: &PgPool,
    parent_user_id: Uuid,
    page: &PageRequest,
) -> anyhow::Result<Vec<Payment>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE parent_user_id = "
    ));
    qb.push_bind(parent_user_id);
    page.push_predicate(&mut qb, "created_at", "id");
    page.push_order_and_limit(&mut qb, "created_at", "id");
    let rows = qb.build_query_as::<Payment>().fetch_all(db).await?;
    Ok(rows)
}
