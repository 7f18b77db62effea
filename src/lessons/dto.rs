use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo::{Lesson, Participation};
use crate::serde_fmt::double_option;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Scheduled,
    Cancelled,
    Done,
}

impl LessonStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LessonStatus::Scheduled => "scheduled",
            LessonStatus::Cancelled => "cancelled",
            LessonStatus::Done => "done",
        }
    }
}

pub type ListQuery = crate::pagination::PageQuery;

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<i64>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(with = "crate::serde_fmt::date")]
    pub from: Date,
    #[serde(with = "crate::serde_fmt::date")]
    pub to: Date,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

/// Single-lesson view.
#[derive(Debug, Serialize)]
pub struct LessonDetail {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    pub duration_minutes: i64,
    pub teacher_name: Option<String>,
    pub cabinet_text: Option<String>,
}

impl From<Lesson> for LessonDetail {
    fn from(l: Lesson) -> Self {
        Self {
            id: l.id,
            duration_minutes: (l.ends_at - l.starts_at).whole_minutes(),
            title: l.topic,
            description: l.plan_text,
            starts_at: l.starts_at,
            teacher_name: l.teacher_name,
            cabinet_text: l.cabinet_text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub group_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub starts_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ends_at: OffsetDateTime,
    pub topic: Option<String>,
    pub plan_text: Option<String>,
    pub teacher_name: Option<String>,
    pub cabinet_text: Option<String>,
    #[serde(default)]
    pub status: Option<LessonStatus>,
}

/// Partial update. Absent fields are kept; `null` clears a nullable text field.
#[derive(Debug, Default, Deserialize)]
pub struct LessonPatch {
    pub group_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub starts_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ends_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "double_option")]
    pub topic: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub plan_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub teacher_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cabinet_text: Option<Option<String>>,
    pub status: Option<LessonStatus>,
}

impl LessonPatch {
    /// The lesson as it would look with this patch applied.
    pub fn apply(&self, current: &Lesson) -> Lesson {
        fn pick(patch: &Option<Option<String>>, current: &Option<String>) -> Option<String> {
            match patch {
                Some(value) => value.clone(),
                None => current.clone(),
            }
        }
        Lesson {
            id: current.id,
            group_id: self.group_id.unwrap_or(current.group_id),
            starts_at: self.starts_at.unwrap_or(current.starts_at),
            ends_at: self.ends_at.unwrap_or(current.ends_at),
            topic: pick(&self.topic, &current.topic),
            plan_text: pick(&self.plan_text, &current.plan_text),
            teacher_name: pick(&self.teacher_name, &current.teacher_name),
            cabinet_text: pick(&self.cabinet_text, &current.cabinet_text),
            status: self
                .status
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|| current.status.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WillGoRequest {
    pub student_id: Uuid,
    #[serde(default)]
    pub will_go: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WillGoResponse {
    pub lesson_id: Uuid,
    pub student_id: Uuid,
    pub will_go: Option<bool>,
}

impl From<Participation> for WillGoResponse {
    fn from(p: Participation) -> Self {
        Self {
            lesson_id: p.lesson_id,
            student_id: p.student_id,
            will_go: p.will_go,
        }
    }
}
