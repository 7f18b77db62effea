use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::is_unique_violation,
    pagination::{Keyed, PageRequest, Position},
    scope::Scope,
    store::TimeWindow,
};

/// Rows per multi-row INSERT; keeps bind parameters well under the protocol limit.
const INSERT_CHUNK: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub group_id: Uuid,
    pub teacher_name: Option<String>,
    pub cabinet_text: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    pub topic: Option<String>,
    pub plan_text: Option<String>,
    pub status: String,
}

impl Keyed for Lesson {
    fn position(&self) -> Position {
        Position::new(self.starts_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLesson {
    pub group_id: Uuid,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub teacher_name: Option<String>,
    pub cabinet_text: Option<String>,
    pub topic: Option<String>,
    pub plan_text: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupSchedule {
    pub id: Uuid,
    pub default_teacher_name: Option<String>,
    pub schedule_json: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct StudentRef {
    pub id: Uuid,
    pub parent_user_id: Uuid,
    pub group_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Participation {
    pub lesson_id: Uuid,
    pub student_id: Uuid,
    pub will_go: Option<bool>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub async fn active_group_schedules(db: &PgPool) -> anyhow::Result<Vec<GroupSchedule>> {
    let rows = sqlx::query_as::<_, GroupSchedule>(
        r#"
        SELECT id, default_teacher_name, schedule_json
        FROM groups
        WHERE is_active
        ORDER BY created_at, id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn group_exists(db: &PgPool, group_id: Uuid) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM groups WHERE id = $1)"#)
        .bind(group_id)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

pub async fn insert_lessons(db: &PgPool, lessons: &[NewLesson]) -> anyhow::Result<u64> {
    if lessons.is_empty() {
        return Ok(0);
    }
    let mut tx = db.begin().await?;
    let mut created = 0;
    for chunk in lessons.chunks(INSERT_CHUNK) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO lessons (group_id, starts_at, ends_at, teacher_name, cabinet_text, topic, plan_text, status) ",
        );
        qb.push_values(chunk, |mut row, l| {
            row.push_bind(l.group_id)
                .push_bind(l.starts_at)
                .push_bind(l.ends_at)
                .push_bind(l.teacher_name.clone())
                .push_bind(l.cabinet_text.clone())
                .push_bind(l.topic.clone())
                .push_bind(l.plan_text.clone())
                .push_bind(l.status.clone());
        });
        qb.push(" ON CONFLICT (group_id, starts_at) DO NOTHING");
        created += qb.build().execute(&mut *tx).await?.rows_affected();
    }
    tx.commit().await?;
    Ok(created)
}

pub async fn create_lesson(db: &PgPool, l: &NewLesson) -> anyhow::Result<Option<Lesson>> {
    let row = sqlx::query_as::<_, Lesson>(
        r#"
        INSERT INTO lessons (group_id, starts_at, ends_at, teacher_name, cabinet_text, topic, plan_text, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (group_id, starts_at) DO NOTHING
        RETURNING id, group_id, teacher_name, cabinet_text, starts_at, ends_at, topic, plan_text, status
        "#,
    )
    .bind(l.group_id)
    .bind(l.starts_at)
    .bind(l.ends_at)
    .bind(&l.teacher_name)
    .bind(&l.cabinet_text)
    .bind(&l.topic)
    .bind(&l.plan_text)
    .bind(&l.status)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn update_lesson(db: &PgPool, l: &Lesson) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE lessons
        SET group_id = $2, starts_at = $3, ends_at = $4, teacher_name = $5,
            cabinet_text = $6, topic = $7, plan_text = $8, status = $9, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(l.id)
    .bind(l.group_id)
    .bind(l.starts_at)
    .bind(l.ends_at)
    .bind(&l.teacher_name)
    .bind(&l.cabinet_text)
    .bind(&l.topic)
    .bind(&l.plan_text)
    .bind(&l.status)
    .execute(db)
    .await;
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub async fn list_lessons(
    db: &PgPool,
    scope: Scope,
    window: Option<TimeWindow>,
    page: &PageRequest,
) -> anyhow::Result<Vec<Lesson>> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT l.id, l.group_id, l.teacher_name, l.cabinet_text, l.starts_at, l.ends_at, \
         l.topic, l.plan_text, l.status FROM lessons l WHERE TRUE",
    );
    scope.push_group_filter(&mut qb, "l.group_id");
    if let Some(w) = window {
        qb.push(" AND l.starts_at >= ")
            .push_bind(w.start)
            .push(" AND l.starts_at < ")
            .push_bind(w.end);
    }
    page.push_predicate(&mut qb, "l.starts_at", "l.id");
    page.push_order_and_limit(&mut qb, "l.starts_at", "l.id");
    let rows = qb.build_query_as::<Lesson>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn find_lesson(db: &PgPool, lesson_id: Uuid) -> anyhow::Result<Option<Lesson>> {
    let row = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, group_id, teacher_name, cabinet_text, starts_at, ends_at, topic, plan_text, status
        FROM lessons
        WHERE id = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn find_student(db: &PgPool, student_id: Uuid) -> anyhow::Result<Option<StudentRef>> {
    let row = sqlx::query_as::<_, StudentRef>(
        r#"SELECT id, parent_user_id, group_id FROM students WHERE id = $1"#,
    )
    .bind(student_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn parent_has_student_in_group(
    db: &PgPool,
    parent_id: Uuid,
    group_id: Uuid,
) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM students WHERE parent_user_id = $1 AND group_id = $2
        )
        "#,
    )
    .bind(parent_id)
    .bind(group_id)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn upsert_participation(
    db: &PgPool,
    lesson_id: Uuid,
    student_id: Uuid,
    will_go: Option<bool>,
) -> anyhow::Result<Participation> {
    let row = sqlx::query_as::<_, Participation>(
        r#"
        INSERT INTO lesson_participation (lesson_id, student_id, will_go, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (lesson_id, student_id)
        DO UPDATE SET will_go = EXCLUDED.will_go, updated_at = EXCLUDED.updated_at
        RETURNING lesson_id, student_id, will_go, updated_at
        "#,
    )
    .bind(lesson_id)
    .bind(student_id)
    .bind(will_go)
    .fetch_one(db)
    .await?;
    Ok(row)
}
