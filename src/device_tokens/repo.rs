use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeviceToken {
    pub id: Uuid,
    pub token: String,
    pub platform: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub revoked_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RevokedToken {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339::option")]
    pub revoked_at: Option<OffsetDateTime>,
}

/// Registers `token` for the user, reviving it if it had been revoked.
pub async fn upsert(
    db: &PgPool,
    user_id: Uuid,
    token: &str,
    platform: Option<&str>,
) -> anyhow::Result<DeviceToken> {
    let row = sqlx::query_as::<_, DeviceToken>(
        r#"
        INSERT INTO device_tokens (user_id, token, platform)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, token)
        DO UPDATE SET platform = EXCLUDED.platform, revoked_at = NULL
        RETURNING id, token, platform, created_at, revoked_at
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(platform)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn revoke(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<RevokedToken>> {
    let row = sqlx::query_as::<_, RevokedToken>(
        r#"
        UPDATE device_tokens SET revoked_at = COALESCE(revoked_at, now())
        WHERE id = $1 AND user_id = $2
        RETURNING id, revoked_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
