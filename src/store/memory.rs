use std::collections::HashSet;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ScheduleStore, TimeWindow};
use crate::{
    lessons::repo::{GroupSchedule, Lesson, NewLesson, Participation, StudentRef},
    pagination::PageRequest,
    scope::Scope,
};

struct MemGroup {
    schedule: GroupSchedule,
    active: bool,
}

#[derive(Default)]
struct Data {
    groups: Vec<MemGroup>,
    lessons: Vec<Lesson>,
    students: Vec<StudentRef>,
    participations: Vec<Participation>,
}

impl Data {
    fn slot_taken(&self, group_id: Uuid, starts_at: OffsetDateTime, except: Option<Uuid>) -> bool {
        self.lessons.iter().any(|l| {
            l.group_id == group_id && l.starts_at == starts_at && Some(l.id) != except
        })
    }

    fn materialize(new: &NewLesson) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            group_id: new.group_id,
            teacher_name: new.teacher_name.clone(),
            cabinet_text: new.cabinet_text.clone(),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            topic: new.topic.clone(),
            plan_text: new.plan_text.clone(),
            status: new.status.clone(),
        }
    }
}

/// In-process [`ScheduleStore`] with the same conflict rules as the database.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Data>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_group(
        &self,
        default_teacher_name: Option<&str>,
        schedule_json: serde_json::Value,
        active: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.data.lock().await.groups.push(MemGroup {
            schedule: GroupSchedule {
                id,
                default_teacher_name: default_teacher_name.map(str::to_string),
                schedule_json,
            },
            active,
        });
        id
    }

    pub async fn add_student(&self, parent_user_id: Uuid, group_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.data.lock().await.students.push(StudentRef {
            id,
            parent_user_id,
            group_id,
        });
        id
    }

    pub async fn add_lesson(&self, group_id: Uuid, starts_at: OffsetDateTime) -> Lesson {
        let lesson = Data::materialize(&NewLesson {
            group_id,
            starts_at,
            ends_at: starts_at + Duration::minutes(60),
            teacher_name: None,
            cabinet_text: None,
            topic: None,
            plan_text: None,
            status: "scheduled".into(),
        });
        self.data.lock().await.lessons.push(lesson.clone());
        lesson
    }

    pub async fn lessons(&self) -> Vec<Lesson> {
        self.data.lock().await.lessons.clone()
    }

    pub async fn participations(&self) -> Vec<Participation> {
        self.data.lock().await.participations.clone()
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn active_group_schedules(&self) -> anyhow::Result<Vec<GroupSchedule>> {
        let data = self.data.lock().await;
        Ok(data
            .groups
            .iter()
            .filter(|g| g.active)
            .map(|g| g.schedule.clone())
            .collect())
    }

    async fn group_exists(&self, group_id: Uuid) -> anyhow::Result<bool> {
        let data = self.data.lock().await;
        Ok(data.groups.iter().any(|g| g.schedule.id == group_id))
    }

    async fn insert_lessons(&self, lessons: &[NewLesson]) -> anyhow::Result<u64> {
        let mut data = self.data.lock().await;
        let mut created = 0;
        for new in lessons {
            if data.slot_taken(new.group_id, new.starts_at, None) {
                continue;
            }
            data.lessons.push(Data::materialize(new));
            created += 1;
        }
        Ok(created)
    }

    async fn create_lesson(&self, lesson: &NewLesson) -> anyhow::Result<Option<Lesson>> {
        let mut data = self.data.lock().await;
        if data.slot_taken(lesson.group_id, lesson.starts_at, None) {
            return Ok(None);
        }
        let row = Data::materialize(lesson);
        data.lessons.push(row.clone());
        Ok(Some(row))
    }

    async fn update_lesson(&self, lesson: &Lesson) -> anyhow::Result<bool> {
        let mut data = self.data.lock().await;
        if data.slot_taken(lesson.group_id, lesson.starts_at, Some(lesson.id)) {
            return Ok(false);
        }
        if let Some(slot) = data.lessons.iter_mut().find(|l| l.id == lesson.id) {
            *slot = lesson.clone();
        }
        Ok(true)
    }

    async fn list_lessons(
        &self,
        scope: Scope,
        window: Option<TimeWindow>,
        page: &PageRequest,
    ) -> anyhow::Result<Vec<Lesson>> {
        let data = self.data.lock().await;
        let visible: Option<HashSet<Uuid>> = match scope {
            Scope::All => None,
            Scope::ParentOf(parent) => Some(
                data.students
                    .iter()
                    .filter(|s| s.parent_user_id == parent)
                    .map(|s| s.group_id)
                    .collect(),
            ),
        };
        let rows = data
            .lessons
            .iter()
            .filter(|l| visible.as_ref().map_or(true, |groups| groups.contains(&l.group_id)))
            .filter(|l| window.map_or(true, |w| w.contains(l.starts_at)))
            .cloned();
        Ok(page.apply(rows))
    }

    async fn find_lesson(&self, lesson_id: Uuid) -> anyhow::Result<Option<Lesson>> {
        let data = self.data.lock().await;
        Ok(data.lessons.iter().find(|l| l.id == lesson_id).cloned())
    }

    async fn find_student(&self, student_id: Uuid) -> anyhow::Result<Option<StudentRef>> {
        let data = self.data.lock().await;
        Ok(data.students.iter().find(|s| s.id == student_id).copied())
    }

    async fn parent_has_student_in_group(
        &self,
        parent_id: Uuid,
        group_id: Uuid,
    ) -> anyhow::Result<bool> {
        let data = self.data.lock().await;
        Ok(data
            .students
            .iter()
            .any(|s| s.parent_user_id == parent_id && s.group_id == group_id))
    }

    async fn upsert_participation(
        &self,
        lesson_id: Uuid,
        student_id: Uuid,
        will_go: Option<bool>,
    ) -> anyhow::Result<Participation> {
        let mut data = self.data.lock().await;
        let row = Participation {
            lesson_id,
            student_id,
            will_go,
            updated_at: OffsetDateTime::now_utc(),
        };
        match data
            .participations
            .iter_mut()
            .find(|p| p.lesson_id == lesson_id && p.student_id == student_id)
        {
            Some(existing) => *existing = row.clone(),
            None => data.participations.push(row.clone()),
        }
        Ok(row)
    }
}
