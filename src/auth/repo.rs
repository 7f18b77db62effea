use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::scope::Scope;

const USER_COLUMNS: &str = "id, email, phone, password_hash, user_type, first_name, last_name, \
     father_name, avatar_url, timezone, settings_json, push_enabled, created_at, updated_at";

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub user_type: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
    pub settings_json: Value,
    pub push_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Values for a freshly registered parent account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParent {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    pub timezone: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
    pub group_id: Uuid,
    pub group_name: String,
    pub course_title: Option<String>,
    pub course_description: Option<String>,
}

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_phone(db: &PgPool, phone: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE phone = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(phone)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    pub async fn role_of(db: &PgPool, id: Uuid) -> anyhow::Result<Option<String>> {
        let role = sqlx::query_scalar::<_, String>("SELECT user_type FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(role)
    }

    /// Inserts a parent account. Unique violations surface as `sqlx::Error`
    /// so the caller can tell a lost registration race apart.
    pub async fn create_parent(
        db: &PgPool,
        parent: &NewParent,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (email, phone, password_hash, user_type, first_name, last_name, \
             father_name, timezone, avatar_url) \
             VALUES ($1, $2, $3, 'parent', $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&parent.email)
            .bind(&parent.phone)
            .bind(password_hash)
            .bind(&parent.first_name)
            .bind(&parent.last_name)
            .bind(&parent.father_name)
            .bind(&parent.timezone)
            .bind(&parent.avatar_url)
            .fetch_one(db)
            .await
    }
}

/// Groups visible to the caller, by name.
pub async fn list_courses(db: &PgPool, scope: Scope) -> anyhow::Result<Vec<Course>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT g.id AS group_id, g.name AS group_name, g.course_title, g.course_description \
         FROM groups g WHERE TRUE",
    );
    scope.push_group_filter(&mut qb, "g.id");
    qb.push(" ORDER BY g.name ASC, g.id ASC");
    let rows = qb.build_query_as::<Course>().fetch_all(db).await?;
    Ok(rows)
}
