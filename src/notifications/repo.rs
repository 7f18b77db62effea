use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::pagination::{Keyed, PageRequest, Position};

pub const LESSON_REMINDER: &str = "lesson_reminder";

const NOTIFICATION_COLUMNS: &str = "id, user_id, notification_type, title, body, payload_json, \
     status, scheduled_at, sent_at, read_at, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "payload")]
    pub payload_json: Value,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub sent_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Keyed for Notification {
    fn position(&self) -> Position {
        Position::new(self.created_at, self.id)
    }
}

pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
    page: &PageRequest,
) -> anyhow::Result<Vec<Notification>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = "
    ));
    qb.push_bind(user_id);
    page.push_predicate(&mut qb, "created_at", "id");
    page.push_order_and_limit(&mut qb, "created_at", "id");
    let rows = qb.build_query_as::<Notification>().fetch_all(db).await?;
    Ok(rows)
}

/// Marks the caller's notification read; `None` if it is not theirs or does not exist.
pub async fn mark_read(
    db: &PgPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> anyhow::Result<Option<Notification>> {
    let sql = format!(
        "UPDATE notifications SET status = 'read', read_at = now() \
         WHERE id = $1 AND user_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Notification>(&sql)
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Queues one reminder per distinct parent of each lesson starting within
/// `[from, to]`, skipping parents already reminded about that lesson.
pub async fn enqueue_lesson_reminders(
    db: &PgPool,
    from: OffsetDateTime,
    to: OffsetDateTime,
    now: OffsetDateTime,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, notification_type, title, body, payload_json, status, scheduled_at)
        SELECT DISTINCT s.parent_user_id, $3, 'Lesson reminder', 'Lesson starts soon',
               jsonb_build_object('lesson_id', l.id::text, 'group_id', l.group_id::text),
               'queued', $4
        FROM lessons l
        JOIN students s ON s.group_id = l.group_id
        WHERE l.starts_at >= $1
          AND l.starts_at <= $2
          AND l.status <> 'cancelled'
          AND NOT EXISTS (
              SELECT 1 FROM notifications n
              WHERE n.user_id = s.parent_user_id
                AND n.notification_type = $3
                AND n.payload_json->>'lesson_id' = l.id::text
          )
        "#,
    )
    .bind(from)
    .bind(to)
    .bind(LESSON_REMINDER)
    .bind(now)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
