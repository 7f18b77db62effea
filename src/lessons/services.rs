use time::{Date, Month, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{CreateLessonRequest, LessonPatch, LessonStatus, ListQuery, MonthQuery, RangeQuery},
    generator::ScheduleConfig,
    repo::{Lesson, NewLesson},
};
use crate::{
    error::{AppError, AppResult},
    pagination::{Direction, Limits, Page, PageRequest},
    scope::{ensure_group_access, Caller},
    store::{ScheduleStore, TimeWindow},
    tz::LocalZone,
};

fn group_not_found() -> AppError {
    AppError::not_found("GROUP_NOT_FOUND", "Group not found")
}

fn lesson_not_found() -> AppError {
    AppError::not_found("LESSON_NOT_FOUND", "Lesson not found")
}

fn month_invalid() -> AppError {
    AppError::bad_request("MONTH_INVALID", "Invalid month")
}

async fn scoped_page(
    store: &dyn ScheduleStore,
    caller: &Caller,
    window: Option<TimeWindow>,
    limit: Option<i64>,
    cursor: Option<&str>,
    limits: Limits,
    direction: Direction,
) -> AppResult<Page<Lesson>> {
    let scope = caller.scope()?;
    let page = PageRequest::parse(limit, cursor, limits, direction)?;
    let rows = store.list_lessons(scope, window, &page).await?;
    Ok(Page::from_rows(rows, &page)?)
}

/// Newest first, across everything the caller may see.
pub async fn list_feed(
    store: &dyn ScheduleStore,
    caller: &Caller,
    q: &ListQuery,
) -> AppResult<Page<Lesson>> {
    scoped_page(
        store,
        caller,
        None,
        q.limit,
        q.cursor.as_deref(),
        Limits::LESSONS,
        Direction::Desc,
    )
    .await
}

/// `[first of month, first of next month)` in local time.
pub fn month_window(zone: &LocalZone, year: i32, month: i64) -> AppResult<TimeWindow> {
    let m = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(month_invalid)?;
    let first = Date::from_calendar_date(year, m, 1).map_err(|_| month_invalid())?;
    let next_year = if m == Month::December { year + 1 } else { year };
    let next = Date::from_calendar_date(next_year, m.next(), 1).map_err(|_| month_invalid())?;
    Ok(TimeWindow {
        start: zone.start_of(first),
        end: zone.start_of(next),
    })
}

/// `[from 00:00, to + 1 day 00:00)` in local time.
pub fn date_range_window(zone: &LocalZone, from: Date, to: Date) -> AppResult<TimeWindow> {
    let invalid = || AppError::bad_request("DATE_RANGE_INVALID", "Invalid date range");
    if from > to {
        return Err(invalid());
    }
    let after = to.next_day().ok_or_else(invalid)?;
    Ok(TimeWindow {
        start: zone.start_of(from),
        end: zone.start_of(after),
    })
}

pub async fn list_month(
    store: &dyn ScheduleStore,
    config: &ScheduleConfig,
    caller: &Caller,
    q: &MonthQuery,
) -> AppResult<Page<Lesson>> {
    let today = config.today();
    let year = q.year.unwrap_or(today.year());
    let month = q.month.unwrap_or(i64::from(u8::from(today.month())));
    let window = month_window(&config.zone, year, month)?;
    scoped_page(
        store,
        caller,
        Some(window),
        q.limit,
        q.cursor.as_deref(),
        Limits::LESSONS_MONTH,
        Direction::Asc,
    )
    .await
}

pub async fn list_range(
    store: &dyn ScheduleStore,
    config: &ScheduleConfig,
    caller: &Caller,
    q: &RangeQuery,
) -> AppResult<Page<Lesson>> {
    let window = date_range_window(&config.zone, q.from, q.to)?;
    scoped_page(
        store,
        caller,
        Some(window),
        q.limit,
        q.cursor.as_deref(),
        Limits::LESSONS_RANGE,
        Direction::Asc,
    )
    .await
}

/// Existence is checked before visibility.
pub async fn get_for_caller(
    store: &dyn ScheduleStore,
    caller: &Caller,
    lesson_id: Uuid,
) -> AppResult<Lesson> {
    let lesson = store
        .find_lesson(lesson_id)
        .await?
        .ok_or_else(lesson_not_found)?;
    ensure_group_access(store, caller, lesson.group_id).await?;
    Ok(lesson)
}

fn ensure_time_order(starts_at: OffsetDateTime, ends_at: OffsetDateTime) -> AppResult<()> {
    if ends_at <= starts_at {
        return Err(AppError::bad_request(
            "LESSON_TIME_INVALID",
            "ends_at must be after starts_at",
        ));
    }
    Ok(())
}

pub async fn create(store: &dyn ScheduleStore, req: CreateLessonRequest) -> AppResult<Lesson> {
    ensure_time_order(req.starts_at, req.ends_at)?;
    if !store.group_exists(req.group_id).await? {
        return Err(group_not_found());
    }
    let new = NewLesson {
        group_id: req.group_id,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        teacher_name: req.teacher_name,
        cabinet_text: req.cabinet_text,
        topic: req.topic,
        plan_text: req.plan_text,
        status: req
            .status
            .unwrap_or(LessonStatus::Scheduled)
            .as_str()
            .to_string(),
    };
    let lesson = store.create_lesson(&new).await?.ok_or_else(|| {
        AppError::conflict("LESSON_EXISTS", "A lesson already starts at this time in this group")
    })?;
    info!(lesson_id = %lesson.id, group_id = %lesson.group_id, "lesson created");
    Ok(lesson)
}

pub async fn update(
    store: &dyn ScheduleStore,
    lesson_id: Uuid,
    patch: &LessonPatch,
) -> AppResult<Lesson> {
    let current = store
        .find_lesson(lesson_id)
        .await?
        .ok_or_else(lesson_not_found)?;
    let next = patch.apply(&current);
    ensure_time_order(next.starts_at, next.ends_at)?;
    if next.group_id != current.group_id && !store.group_exists(next.group_id).await? {
        return Err(group_not_found());
    }
    if !store.update_lesson(&next).await? {
        return Err(AppError::conflict(
            "LESSON_EXISTS",
            "A lesson already starts at this time in this group",
        ));
    }
    info!(%lesson_id, "lesson updated");
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{scope::Role, store::memory::MemoryStore};
    use axum::http::StatusCode;
    use serde_json::json;
    use time::{macros::{date, datetime}, Duration};

    fn vienna() -> LocalZone {
        LocalZone::named("Europe/Vienna").unwrap()
    }

    fn admin() -> Caller {
        Caller::new(Uuid::new_v4(), Role::Admin)
    }

    fn feed(limit: i64, cursor: Option<String>) -> ListQuery {
        ListQuery {
            limit: Some(limit),
            cursor,
        }
    }

    #[tokio::test]
    async fn limit_one_walks_two_lessons() {
        let store = MemoryStore::new();
        let group = store.add_group(None, json!([]), true).await;
        let older = store.add_lesson(group, datetime!(2026-10-19 08:00 UTC)).await;
        let newer = store.add_lesson(group, datetime!(2026-10-26 09:00 UTC)).await;
        let caller = admin();

        let first = list_feed(&store, &caller, &feed(1, None)).await.unwrap();
        assert_eq!(first.items, vec![newer]);
        assert!(first.next_cursor.is_some());

        let second = list_feed(&store, &caller, &feed(1, first.next_cursor)).await.unwrap();
        assert_eq!(second.items, vec![older]);
        // a full page always carries a cursor; the empty page after it ends the walk
        let third = list_feed(&store, &caller, &feed(1, second.next_cursor)).await.unwrap();
        assert!(third.items.is_empty());
        assert!(third.next_cursor.is_none());
    }

    #[tokio::test]
    async fn parent_sees_only_groups_of_their_students() {
        let store = MemoryStore::new();
        let parent = Caller::new(Uuid::new_v4(), Role::Parent);
        let mine = store.add_group(None, json!([]), true).await;
        let theirs = store.add_group(None, json!([]), true).await;
        // two siblings in the same group must not duplicate lessons
        store.add_student(parent.id, mine).await;
        store.add_student(parent.id, mine).await;
        store.add_student(Uuid::new_v4(), theirs).await;
        let base = datetime!(2026-10-01 08:00 UTC);
        for i in 0..5 {
            store.add_lesson(mine, base + Duration::days(i)).await;
            store.add_lesson(theirs, base + Duration::days(i)).await;
        }

        let page = list_feed(&store, &parent, &feed(50, None)).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(page.items.iter().all(|l| l.group_id == mine));

        let all = list_feed(&store, &admin(), &feed(50, None)).await.unwrap();
        assert_eq!(all.items.len(), 10);
    }

    #[tokio::test]
    async fn other_roles_are_forbidden_and_bad_cursors_rejected() {
        let store = MemoryStore::new();
        let teacher = Caller::new(Uuid::new_v4(), Role::parse("teacher"));
        let err = list_feed(&store, &teacher, &ListQuery::default()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = list_feed(&store, &admin(), &feed(5, Some("%%%".into())))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CURSOR_INVALID");
    }

    #[tokio::test]
    async fn feed_order_is_descending_with_id_tiebreak() {
        let store = MemoryStore::new();
        let at = datetime!(2026-10-19 08:00 UTC);
        for _ in 0..4 {
            let g = store.add_group(None, json!([]), true).await;
            store.add_lesson(g, at).await;
        }
        let caller = admin();
        let mut cursor = None;
        let mut seen = Vec::new();
        loop {
            let page = list_feed(&store, &caller, &feed(3, cursor)).await.unwrap();
            seen.extend(page.items);
            match page.next_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(seen.len(), 4);
        let ids: Vec<_> = seen.iter().map(|l| l.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ids, sorted);
    }

    #[test]
    fn month_windows_follow_local_midnight() {
        let w = month_window(&vienna(), 2026, 10).unwrap();
        assert_eq!(w.start, datetime!(2026-09-30 22:00 UTC));
        assert_eq!(w.end, datetime!(2026-10-31 23:00 UTC));

        let dec = month_window(&vienna(), 2026, 12).unwrap();
        assert_eq!(dec.end, datetime!(2026-12-31 23:00 UTC));

        assert_eq!(month_window(&vienna(), 2026, 13).unwrap_err().code(), "MONTH_INVALID");
        assert_eq!(month_window(&vienna(), 2026, 0).unwrap_err().code(), "MONTH_INVALID");
    }

    #[test]
    fn range_window_includes_the_last_day() {
        let w = date_range_window(&vienna(), date!(2026 - 01 - 07), date!(2026 - 01 - 07)).unwrap();
        assert_eq!(w.start, datetime!(2026-01-06 23:00 UTC));
        assert_eq!(w.end, datetime!(2026-01-07 23:00 UTC));
        let err = date_range_window(&vienna(), date!(2026 - 01 - 08), date!(2026 - 01 - 07))
            .unwrap_err();
        assert_eq!(err.code(), "DATE_RANGE_INVALID");
    }

    #[tokio::test]
    async fn month_listing_is_ascending_and_bounded() {
        let store = MemoryStore::new();
        let g = store.add_group(None, json!([]), true).await;
        let inside_late = store.add_lesson(g, datetime!(2026-10-31 22:30 UTC)).await;
        let inside_early = store.add_lesson(g, datetime!(2026-09-30 22:00 UTC)).await;
        store.add_lesson(g, datetime!(2026-10-31 23:00 UTC)).await;
        store.add_lesson(g, datetime!(2026-09-30 21:59 UTC)).await;

        let config = ScheduleConfig::new(vienna()).with_today(date!(2026 - 10 - 18));
        let page = list_month(&store, &config, &admin(), &MonthQuery::default())
            .await
            .unwrap();
        assert_eq!(page.items, vec![inside_early, inside_late]);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn single_fetch_checks_existence_then_ownership() {
        let store = MemoryStore::new();
        let parent = Caller::new(Uuid::new_v4(), Role::Parent);
        let g = store.add_group(None, json!([]), true).await;
        let lesson = store.add_lesson(g, datetime!(2026-10-19 08:00 UTC)).await;

        let err = get_for_caller(&store, &parent, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = get_for_caller(&store, &parent, lesson.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        store.add_student(parent.id, g).await;
        assert_eq!(get_for_caller(&store, &parent, lesson.id).await.unwrap(), lesson);
        assert_eq!(get_for_caller(&store, &admin(), lesson.id).await.unwrap(), lesson);
    }

    fn create_req(group_id: Uuid, minutes: i64) -> CreateLessonRequest {
        let starts_at = datetime!(2026-11-02 09:00 UTC);
        CreateLessonRequest {
            group_id,
            starts_at,
            ends_at: starts_at + Duration::minutes(minutes),
            topic: Some("Geometry".into()),
            plan_text: None,
            teacher_name: None,
            cabinet_text: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn create_validates_time_group_and_uniqueness() {
        let store = MemoryStore::new();
        let g = store.add_group(None, json!([]), true).await;

        let err = create(&store, create_req(g, 0)).await.unwrap_err();
        assert_eq!(err.code(), "LESSON_TIME_INVALID");
        let err = create(&store, create_req(Uuid::new_v4(), 60)).await.unwrap_err();
        assert_eq!(err.code(), "GROUP_NOT_FOUND");

        let lesson = create(&store, create_req(g, 60)).await.unwrap();
        assert_eq!(lesson.status, "scheduled");
        let err = create(&store, create_req(g, 45)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_applies_patch_and_guards_invariants() {
        let store = MemoryStore::new();
        let g = store.add_group(None, json!([]), true).await;
        let a = store.add_lesson(g, datetime!(2026-10-19 08:00 UTC)).await;
        let b = store.add_lesson(g, datetime!(2026-10-26 09:00 UTC)).await;

        let patch: LessonPatch =
            serde_json::from_value(json!({"topic": "Algebra", "status": "done"})).unwrap();
        let updated = update(&store, a.id, &patch).await.unwrap();
        assert_eq!(updated.topic.as_deref(), Some("Algebra"));
        assert_eq!(store.lessons().await.iter().find(|l| l.id == a.id), Some(&updated));

        let backwards: LessonPatch =
            serde_json::from_value(json!({"ends_at": "2026-10-19T07:00:00Z"})).unwrap();
        assert_eq!(
            update(&store, a.id, &backwards).await.unwrap_err().code(),
            "LESSON_TIME_INVALID"
        );

        let clash = LessonPatch {
            starts_at: Some(b.starts_at),
            ends_at: Some(b.ends_at),
            ..LessonPatch::default()
        };
        assert_eq!(update(&store, a.id, &clash).await.unwrap_err().code(), "LESSON_EXISTS");
        assert_eq!(
            update(&store, Uuid::new_v4(), &LessonPatch::default()).await.unwrap_err().code(),
            "LESSON_NOT_FOUND"
        );
    }
}
