use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ScheduleStore, TimeWindow};
use crate::{
    lessons::repo::{self, GroupSchedule, Lesson, NewLesson, Participation, StudentRef},
    pagination::PageRequest,
    scope::Scope,
};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn active_group_schedules(&self) -> anyhow::Result<Vec<GroupSchedule>> {
        repo::active_group_schedules(&self.db).await
    }

    async fn group_exists(&self, group_id: Uuid) -> anyhow::Result<bool> {
        repo::group_exists(&self.db, group_id).await
    }

    async fn insert_lessons(&self, lessons: &[NewLesson]) -> anyhow::Result<u64> {
        repo::insert_lessons(&self.db, lessons).await
    }

    async fn create_lesson(&self, lesson: &NewLesson) -> anyhow::Result<Option<Lesson>> {
        repo::create_lesson(&self.db, lesson).await
    }

    async fn update_lesson(&self, lesson: &Lesson) -> anyhow::Result<bool> {
        repo::update_lesson(&self.db, lesson).await
    }

    async fn list_lessons(
        &self,
        scope: Scope,
        window: Option<TimeWindow>,
        page: &PageRequest,
    ) -> anyhow::Result<Vec<Lesson>> {
        repo::list_lessons(&self.db, scope, window, page).await
    }

    async fn find_lesson(&self, lesson_id: Uuid) -> anyhow::Result<Option<Lesson>> {
        repo::find_lesson(&self.db, lesson_id).await
    }

    async fn find_student(&self, student_id: Uuid) -> anyhow::Result<Option<StudentRef>> {
        repo::find_student(&self.db, student_id).await
    }

    async fn parent_has_student_in_group(
        &self,
        parent_id: Uuid,
        group_id: Uuid,
    ) -> anyhow::Result<bool> {
        repo::parent_has_student_in_group(&self.db, parent_id, group_id).await
    }

    async fn upsert_participation(
        &self,
        lesson_id: Uuid,
        student_id: Uuid,
        will_go: Option<bool>,
    ) -> anyhow::Result<Participation> {
        repo::upsert_participation(&self.db, lesson_id, student_id, will_go).await
    }
}
