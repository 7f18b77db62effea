use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct DayCount {
    pub day: Date,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct PaymentDay {
    pub day: Date,
    pub count: i64,
    pub amount_cents: i64,
    pub paid_count: i64,
    pub paid_amount_cents: i64,
}

/// A table and the timestamp column bucketed per local day.
#[derive(Debug, Clone, Copy)]
pub struct Series {
    pub table: &'static str,
    pub column: &'static str,
}

pub async fn total(db: &PgPool, table: &'static str) -> anyhow::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let n = sqlx::query_scalar::<_, i64>(&sql).fetch_one(db).await?;
    Ok(n)
}

pub async fn users_by_type(db: &PgPool) -> anyhow::Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT user_type, COUNT(*) FROM users GROUP BY user_type",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Rows per local calendar day of `series.column` within `[start, end)`.
pub async fn daily(
    db: &PgPool,
    series: Series,
    timezone: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<Vec<DayCount>> {
    let Series { table, column } = series;
    let sql = format!(
        "SELECT ({column} AT TIME ZONE $1)::date AS day, COUNT(*) AS count \
         FROM {table} WHERE {column} >= $2 AND {column} < $3 \
         GROUP BY day ORDER BY day"
    );
    let rows = sqlx::query_as::<_, DayCount>(&sql)
        .bind(timezone)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn daily_payments(
    db: &PgPool,
    timezone: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> anyhow::Result<Vec<PaymentDay>> {
    let rows = sqlx::query_as::<_, PaymentDay>(
        r#"
        SELECT (created_at AT TIME ZONE $1)::date AS day,
               COUNT(*) AS count,
               COALESCE(SUM(amount_cents), 0)::BIGINT AS amount_cents,
               COUNT(*) FILTER (WHERE status = 'paid') AS paid_count,
               COALESCE(SUM(amount_cents) FILTER (WHERE status = 'paid'), 0)::BIGINT AS paid_amount_cents
        FROM payments
        WHERE created_at >= $2 AND created_at < $3
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(timezone)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
