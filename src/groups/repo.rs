use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const GROUP_COLUMNS: &str = "id, name, course_title, course_description, default_teacher_name, \
     capacity, is_active, schedule_json, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub course_title: Option<String>,
    pub course_description: Option<String>,
    pub default_teacher_name: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub schedule_json: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub course_title: Option<String>,
    pub course_description: Option<String>,
    pub default_teacher_name: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub schedule_json: Value,
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Group>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM groups ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Group>(&sql).fetch_all(db).await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Group>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1");
    let row = sqlx::query_as::<_, Group>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, group: &NewGroup) -> anyhow::Result<Group> {
    let sql = format!(
        "INSERT INTO groups (name, course_title, course_description, default_teacher_name, \
         capacity, is_active, schedule_json) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {GROUP_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Group>(&sql)
        .bind(&group.name)
        .bind(&group.course_title)
        .bind(&group.course_description)
        .bind(&group.default_teacher_name)
        .bind(group.capacity)
        .bind(group.is_active)
        .bind(&group.schedule_json)
        .fetch_one(db)
        .await?;
    Ok(row)
}

/// Writes every mutable column of `group`; `None` if the row is gone.
pub async fn update(db: &PgPool, group: &Group) -> anyhow::Result<Option<Group>> {
    let sql = format!(
        "UPDATE groups SET name = $2, course_title = $3, course_description = $4, \
         default_teacher_name = $5, capacity = $6, is_active = $7, schedule_json = $8, \
         updated_at = now() \
         WHERE id = $1 RETURNING {GROUP_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Group>(&sql)
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.course_title)
        .bind(&group.course_description)
        .bind(&group.default_teacher_name)
        .bind(group.capacity)
        .bind(group.is_active)
        .bind(&group.schedule_json)
        .fetch_optional(db)
        .await?;
    Ok(row)
}
