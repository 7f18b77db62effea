use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::serde_fmt;

const STUDENT_COLUMNS: &str = "id, parent_user_id, group_id, first_name, last_name, father_name, \
     birthdate, school_class, group_number, is_active, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub parent_user_id: Uuid,
    pub group_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    #[serde(with = "serde_fmt::option_date")]
    pub birthdate: Option<Date>,
    pub school_class: Option<String>,
    pub group_number: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub parent_user_id: Uuid,
    pub group_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub father_name: Option<String>,
    pub birthdate: Option<Date>,
    pub school_class: Option<String>,
    pub group_number: Option<String>,
}

pub async fn list_for_parent(db: &PgPool, parent_user_id: Uuid) -> anyhow::Result<Vec<Student>> {
    let sql = format!(
        "SELECT {STUDENT_COLUMNS} FROM students WHERE parent_user_id = $1 \
         ORDER BY created_at ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, Student>(&sql)
        .bind(parent_user_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn insert(db: &PgPool, student: &NewStudent) -> anyhow::Result<Student> {
    let sql = format!(
        "INSERT INTO students (parent_user_id, group_id, first_name, last_name, father_name, \
         birthdate, school_class, group_number) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {STUDENT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Student>(&sql)
        .bind(student.parent_user_id)
        .bind(student.group_id)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.father_name)
        .bind(student.birthdate)
        .bind(&student.school_class)
        .bind(&student.group_number)
        .fetch_one(db)
        .await?;
    Ok(row)
}
