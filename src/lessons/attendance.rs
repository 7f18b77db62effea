use tracing::info;
use uuid::Uuid;

use super::repo::{Lesson, Participation, StudentRef};
use crate::{
    error::{AppError, AppResult},
    scope::Caller,
    store::ScheduleStore,
};

/// A caller's student and a lesson of that student's group.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub student: StudentRef,
    pub lesson: Lesson,
}

/// Ownership first, then existence of the lesson, then group membership.
pub async fn check_enrollment(
    store: &dyn ScheduleStore,
    caller: &Caller,
    lesson_id: Uuid,
    student_id: Uuid,
) -> AppResult<Enrollment> {
    let student = store
        .find_student(student_id)
        .await?
        .filter(|s| s.parent_user_id == caller.id)
        .ok_or_else(|| AppError::forbidden("FORBIDDEN", "Student does not belong to parent"))?;

    let lesson = store
        .find_lesson(lesson_id)
        .await?
        .ok_or_else(|| AppError::not_found("LESSON_NOT_FOUND", "Lesson not found"))?;

    if lesson.group_id != student.group_id {
        return Err(AppError::bad_request(
            "LESSON_NOT_IN_CHILD_GROUP",
            "Lesson not in child group",
        ));
    }
    Ok(Enrollment { student, lesson })
}

/// Records a parent's RSVP for one of their students. Last write wins.
pub async fn upsert_will_go(
    store: &dyn ScheduleStore,
    caller: &Caller,
    lesson_id: Uuid,
    student_id: Uuid,
    will_go: Option<bool>,
) -> AppResult<Participation> {
    check_enrollment(store, caller, lesson_id, student_id).await?;
    let row = store
        .upsert_participation(lesson_id, student_id, will_go)
        .await?;
    info!(user_id = %caller.id, %lesson_id, %student_id, ?will_go, "attendance recorded");
    Ok(row)
}
