use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::pagination::{Keyed, PageRequest, Position};

const MATERIAL_COLUMNS: &str =
    "id, group_id, title, body_text, material_type, link_url, is_published, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Material {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub body_text: Option<String>,
    #[serde(rename = "type")]
    pub material_type: String,
    pub link_url: Option<String>,
    pub is_published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Keyed for Material {
    fn position(&self) -> Position {
        Position::new(self.created_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaterial {
    pub group_id: Uuid,
    pub title: String,
    pub body_text: Option<String>,
    pub material_type: &'static str,
    pub link_url: Option<String>,
    pub is_published: bool,
}

/// Materials of one group, newest first. `published_only` hides drafts.
pub async fn list_for_group(
    db: &PgPool,
    group_id: Uuid,
    published_only: bool,
    page: &PageRequest,
) -> anyhow::Result<Vec<Material>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE group_id = "
    ));
    qb.push_bind(group_id);
    if published_only {
        qb.push(" AND is_published");
    }
    page.push_predicate(&mut qb, "created_at", "id");
    page.push_order_and_limit(&mut qb, "created_at", "id");
    let rows = qb.build_query_as::<Material>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Material>> {
    let sql = format!("SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1");
    let row = sqlx::query_as::<_, Material>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn insert(db: &PgPool, material: &NewMaterial) -> anyhow::Result<Material> {
    let sql = format!(
        "INSERT INTO materials (group_id, title, body_text, material_type, link_url, is_published) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MATERIAL_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Material>(&sql)
        .bind(material.group_id)
        .bind(&material.title)
        .bind(&material.body_text)
        .bind(material.material_type)
        .bind(&material.link_url)
        .bind(material.is_published)
        .fetch_one(db)
        .await?;
    Ok(row)
}
