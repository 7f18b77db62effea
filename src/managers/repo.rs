use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

const MANAGER_COLUMNS: &str =
    "id, first_name, last_name, father_name, telegram_url, whatsapp_url, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Manager {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub father_name: Option<String>,
    pub telegram_url: Option<String>,
    pub whatsapp_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerFields {
    pub first_name: String,
    pub last_name: String,
    pub father_name: Option<String>,
    pub telegram_url: Option<String>,
    pub whatsapp_url: Option<String>,
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Manager>> {
    let sql = format!("SELECT {MANAGER_COLUMNS} FROM managers ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Manager>(&sql).fetch_all(db).await?;
    Ok(rows)
}

pub async fn insert(db: &PgPool, fields: &ManagerFields) -> anyhow::Result<Manager> {
    let sql = format!(
        "INSERT INTO managers (first_name, last_name, father_name, telegram_url, whatsapp_url) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {MANAGER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Manager>(&sql)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.father_name)
        .bind(&fields.telegram_url)
        .bind(&fields.whatsapp_url)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, fields: &ManagerFields) -> anyhow::Result<Option<Manager>> {
    let sql = format!(
        "UPDATE managers SET first_name = $2, last_name = $3, father_name = $4, \
         telegram_url = $5, whatsapp_url = $6 WHERE id = $1 RETURNING {MANAGER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Manager>(&sql)
        .bind(id)
        .bind(&fields.first_name)
        .bind(&fields.last_name)
        .bind(&fields.father_name)
        .bind(&fields.telegram_url)
        .bind(&fields.whatsapp_url)
        .fetch_optional(db)
        .await?;
    Ok(row)
}
