//! Persistence contract of the scheduling core.
//!
//! Lesson listing, generation and attendance only talk to a [`ScheduleStore`],
//! so they run unchanged against Postgres and against the in-memory store the
//! tests use.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    lessons::repo::{GroupSchedule, Lesson, NewLesson, Participation, StudentRef},
    pagination::PageRequest,
    scope::Scope,
};

#[cfg(test)]
pub mod memory;
pub mod pg;

pub use pg::PgStore;

/// Half-open interval `[start, end)` on `starts_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeWindow {
    #[cfg(test)]
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.start <= at && at < self.end
    }
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Active groups with their raw recurrence rules.
    async fn active_group_schedules(&self) -> anyhow::Result<Vec<GroupSchedule>>;

    async fn group_exists(&self, group_id: Uuid) -> anyhow::Result<bool>;

    /// Inserts all rows in one transaction, silently skipping any whose
    /// `(group_id, starts_at)` already exists. Returns how many were new.
    async fn insert_lessons(&self, lessons: &[NewLesson]) -> anyhow::Result<u64>;

    /// Single insert; `None` when `(group_id, starts_at)` is taken.
    async fn create_lesson(&self, lesson: &NewLesson) -> anyhow::Result<Option<Lesson>>;

    /// Persists every mutable column of `lesson`. `Ok(false)` when the new
    /// `(group_id, starts_at)` collides with another lesson.
    async fn update_lesson(&self, lesson: &Lesson) -> anyhow::Result<bool>;

    async fn list_lessons(
        &self,
        scope: Scope,
        window: Option<TimeWindow>,
        page: &PageRequest,
    ) -> anyhow::Result<Vec<Lesson>>;

    async fn find_lesson(&self, lesson_id: Uuid) -> anyhow::Result<Option<Lesson>>;

    async fn find_student(&self, student_id: Uuid) -> anyhow::Result<Option<StudentRef>>;

    async fn parent_has_student_in_group(
        &self,
        parent_id: Uuid,
        group_id: Uuid,
    ) -> anyhow::Result<bool>;

    /// Insert-or-overwrite of `will_go` on `(lesson_id, student_id)`.
    async fn upsert_participation(
        &self,
        lesson_id: Uuid,
        student_id: Uuid,
        will_go: Option<bool>,
    ) -> anyhow::Result<Participation>;
}
