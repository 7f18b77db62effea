//! Expands the weekly recurrence rules of active groups into lesson rows.
//!
//! Runs are idempotent: rows are keyed on `(group_id, starts_at)` and the
//! store skips keys that already exist, so repeated runs converge.

use std::{collections::HashSet, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use time::{
    format_description::FormatItem, macros::format_description, Date, Duration, OffsetDateTime,
    Time, Weekday,
};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{dto::LessonStatus, repo::{GroupSchedule, NewLesson}};
use crate::{
    error::{AppError, AppResult},
    store::ScheduleStore,
    tz::LocalZone,
};

pub const DEFAULT_HORIZON_DAYS: i64 = 30;
pub const MAX_HORIZON_DAYS: i64 = 366;

const HH_MM: &[FormatItem<'static>] = format_description!("[hour]:[minute]");
const HH_MM_SS: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Calendar settings shared by the generator and the calendar listings.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub zone: LocalZone,
    fixed_today: Option<Date>,
}

impl ScheduleConfig {
    pub fn new(zone: LocalZone) -> Self {
        Self {
            zone,
            fixed_today: None,
        }
    }

    /// Pins "today" instead of reading the clock.
    #[cfg(test)]
    pub fn with_today(mut self, today: Date) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn today(&self) -> Date {
        self.fixed_today.unwrap_or_else(|| self.zone.today())
    }
}

/// One validated entry of a group's `schedule_json`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub weekday: Weekday,
    pub start_time: Time,
    pub duration: Duration,
    pub cabinet_text: Option<String>,
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn weekday_from_iso(n: i64) -> Option<Weekday> {
    Some(match n {
        1 => Weekday::Monday,
        2 => Weekday::Tuesday,
        3 => Weekday::Wednesday,
        4 => Weekday::Thursday,
        5 => Weekday::Friday,
        6 => Weekday::Saturday,
        7 => Weekday::Sunday,
        _ => return None,
    })
}

fn parse_start_time(raw: &str) -> Option<Time> {
    let raw = raw.trim();
    Time::parse(raw, HH_MM)
        .or_else(|_| Time::parse(raw, HH_MM_SS))
        .ok()
}

impl RecurrenceRule {
    /// `None` for anything that is not a usable rule.
    pub fn parse(item: &Value) -> Option<Self> {
        let obj = item.as_object()?;
        let weekday = weekday_from_iso(as_integer(obj.get("weekday")?)?)?;
        let start_time = parse_start_time(obj.get("start_time")?.as_str()?)?;
        let minutes = as_integer(obj.get("duration_minutes")?)?;
        if minutes <= 0 {
            return None;
        }
        let cabinet_text = obj
            .get("cabinet_text")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self {
            weekday,
            start_time,
            duration: Duration::minutes(minutes),
            cabinet_text,
        })
    }

    /// Dates in `[today, last]` that fall on this rule's weekday.
    pub fn dates(&self, today: Date, last: Date) -> Vec<Date> {
        let ahead = (i64::from(self.weekday.number_from_monday())
            - i64::from(today.weekday().number_from_monday()))
        .rem_euclid(7);
        let mut out = Vec::new();
        let mut current = today.checked_add(Duration::days(ahead));
        while let Some(date) = current.filter(|d| *d <= last) {
            out.push(date);
            current = date.checked_add(Duration::weeks(1));
        }
        out
    }

    fn lesson_at(&self, zone: &LocalZone, group: &GroupSchedule, date: Date) -> Option<NewLesson> {
        let starts_at: OffsetDateTime = zone.at(date, self.start_time);
        let ends_at = starts_at.checked_add(self.duration)?;
        Some(NewLesson {
            group_id: group.id,
            starts_at,
            ends_at,
            teacher_name: group.default_teacher_name.clone(),
            cabinet_text: self.cabinet_text.clone(),
            topic: None,
            plan_text: None,
            status: LessonStatus::Scheduled.as_str().to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    /// Rows that did not exist before this run.
    pub created: u64,
    /// Schedule entries ignored because they did not validate.
    pub skipped_rules: usize,
}

/// Candidate rows for `[today, today + days]`, deduplicated on `(group_id, starts_at)`.
pub fn plan(
    zone: &LocalZone,
    groups: &[GroupSchedule],
    today: Date,
    days: i64,
) -> (Vec<NewLesson>, usize) {
    let last = today
        .checked_add(Duration::days(days))
        .unwrap_or(Date::MAX);
    let mut seen: HashSet<(Uuid, OffsetDateTime)> = HashSet::new();
    let mut rows = Vec::new();
    let mut skipped = 0;

    for group in groups {
        let Some(items) = group.schedule_json.as_array() else {
            debug!(group_id = %group.id, "schedule is not a list; skipping group");
            continue;
        };
        for item in items {
            let Some(rule) = RecurrenceRule::parse(item) else {
                debug!(group_id = %group.id, rule = %item, "skipping invalid recurrence rule");
                skipped += 1;
                continue;
            };
            for date in rule.dates(today, last) {
                if let Some(row) = rule.lesson_at(zone, group, date) {
                    if seen.insert((row.group_id, row.starts_at)) {
                        rows.push(row);
                    }
                }
            }
        }
    }
    (rows, skipped)
}

pub struct LessonGenerator {
    store: Arc<dyn ScheduleStore>,
    config: ScheduleConfig,
}

impl LessonGenerator {
    pub fn new(store: Arc<dyn ScheduleStore>, config: ScheduleConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self))]
    pub async fn generate(&self, days: i64) -> AppResult<GenerationReport> {
        if days > MAX_HORIZON_DAYS {
            return Err(AppError::bad_request(
                "DAYS_INVALID",
                format!("days must be at most {MAX_HORIZON_DAYS}"),
            ));
        }
        let today = self.config.today();
        let groups = self.store.active_group_schedules().await?;
        let (rows, skipped_rules) = plan(&self.config.zone, &groups, today, days);
        let created = self.store.insert_lessons(&rows).await?;
        info!(
            %today,
            days,
            groups = groups.len(),
            candidates = rows.len(),
            created,
            skipped_rules,
            "lesson generation finished"
        );
        Ok(GenerationReport {
            created,
            skipped_rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;
    use time::macros::{date, datetime, time};

    fn vienna() -> LocalZone {
        LocalZone::named("Europe/Vienna").unwrap()
    }

    fn generator(store: &Arc<MemoryStore>, today: Date) -> LessonGenerator {
        let config = ScheduleConfig::new(vienna()).with_today(today);
        LessonGenerator::new(store.clone(), config)
    }

    #[test]
    fn parses_lenient_rule_shapes() {
        let rule = RecurrenceRule::parse(&json!({
            "weekday": "1", "start_time": "10:00:00", "duration_minutes": 90.0, "cabinet_text": "B12"
        }))
        .unwrap();
        assert_eq!(rule.weekday, Weekday::Monday);
        assert_eq!(rule.start_time, time!(10:00));
        assert_eq!(rule.duration, Duration::minutes(90));
        assert_eq!(rule.cabinet_text.as_deref(), Some("B12"));

        let sunday = RecurrenceRule::parse(&json!({
            "weekday": 7, "start_time": "08:30", "duration_minutes": 45, "cabinet_text": 5
        }))
        .unwrap();
        assert_eq!(sunday.weekday, Weekday::Sunday);
        assert!(sunday.cabinet_text.is_none());
    }

    #[test]
    fn rejects_invalid_rules() {
        let bad = [
            json!({"weekday": 0, "start_time": "10:00", "duration_minutes": 60}),
            json!({"weekday": 8, "start_time": "10:00", "duration_minutes": 60}),
            json!({"weekday": true, "start_time": "10:00", "duration_minutes": 60}),
            json!({"weekday": 1, "duration_minutes": 60}),
            json!({"weekday": 1, "start_time": "25:00", "duration_minutes": 60}),
            json!({"weekday": 1, "start_time": "", "duration_minutes": 60}),
            json!({"weekday": 1, "start_time": "10:00", "duration_minutes": 0}),
            json!({"weekday": 1, "start_time": "10:00", "duration_minutes": -15}),
            json!({"weekday": 1, "start_time": "10:00", "duration_minutes": "long"}),
            json!("monday at ten"),
        ];
        for item in bad {
            assert!(RecurrenceRule::parse(&item).is_none(), "accepted {item}");
        }
    }

    #[test]
    fn dates_start_today_when_weekday_matches_and_include_last_day() {
        let rule = RecurrenceRule::parse(&json!({
            "weekday": 3, "start_time": "10:00", "duration_minutes": 60
        }))
        .unwrap();
        let today = date!(2026 - 10 - 14);
        assert_eq!(
            rule.dates(today, date!(2026 - 10 - 21)),
            vec![date!(2026 - 10 - 14), date!(2026 - 10 - 21)]
        );
        assert_eq!(rule.dates(today, today), vec![today]);
    }

    #[tokio::test]
    async fn monday_rule_over_two_weeks_from_wednesday_creates_two_lessons() {
        let store = Arc::new(MemoryStore::new());
        let group = store
            .add_group(
                Some("Ms. Novak"),
                json!([{"weekday": 1, "start_time": "10:00", "duration_minutes": 60, "cabinet_text": "Room 4"}]),
                true,
            )
            .await;

        let report = generator(&store, date!(2026 - 10 - 14)).generate(14).await.unwrap();
        assert_eq!(report, GenerationReport { created: 2, skipped_rules: 0 });

        let mut lessons = store.lessons().await;
        lessons.sort_by_key(|l| l.starts_at);
        assert_eq!(lessons.len(), 2);
        // clocks go back on 2026-10-25, so the local 10:00 moves by an hour in UTC
        assert_eq!(lessons[0].starts_at, datetime!(2026-10-19 08:00 UTC));
        assert_eq!(lessons[1].starts_at, datetime!(2026-10-26 09:00 UTC));
        for lesson in &lessons {
            assert_eq!(lesson.group_id, group);
            assert_eq!(lesson.ends_at - lesson.starts_at, Duration::minutes(60));
            assert_eq!(lesson.teacher_name.as_deref(), Some("Ms. Novak"));
            assert_eq!(lesson.cabinet_text.as_deref(), Some("Room 4"));
            assert_eq!(lesson.status, "scheduled");
        }
    }

    #[tokio::test]
    async fn second_run_inserts_nothing() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_group(
                None,
                json!([
                    {"weekday": 2, "start_time": "16:00", "duration_minutes": 45},
                    {"weekday": 4, "start_time": "16:00", "duration_minutes": 45}
                ]),
                true,
            )
            .await;
        let gen = generator(&store, date!(2026 - 03 - 25));

        let first = gen.generate(30).await.unwrap();
        assert!(first.created > 0);
        let after_first = store.lessons().await.len();

        let second = gen.generate(30).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(store.lessons().await.len(), after_first);
    }

    #[tokio::test]
    async fn longer_horizon_only_adds_the_tail() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_group(None, json!([{"weekday": 1, "start_time": "10:00", "duration_minutes": 60}]), true)
            .await;
        let gen = generator(&store, date!(2026 - 10 - 14));
        assert_eq!(gen.generate(14).await.unwrap().created, 2);
        assert_eq!(gen.generate(21).await.unwrap().created, 1);
    }

    #[tokio::test]
    async fn invalid_rules_and_inactive_groups_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .add_group(
                None,
                json!([
                    {"weekday": 9, "start_time": "10:00", "duration_minutes": 60},
                    {"weekday": 1, "start_time": "nope", "duration_minutes": 60},
                    {"weekday": 1, "start_time": "10:00", "duration_minutes": 60}
                ]),
                true,
            )
            .await;
        store
            .add_group(None, json!([{"weekday": 1, "start_time": "10:00", "duration_minutes": 60}]), false)
            .await;
        store.add_group(None, json!({"weekday": 1}), true).await;

        let report = generator(&store, date!(2026 - 10 - 14)).generate(7).await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped_rules, 2);
    }

    #[tokio::test]
    async fn duplicate_rules_in_one_group_collapse() {
        let store = Arc::new(MemoryStore::new());
        let rule = json!({"weekday": 5, "start_time": "12:00", "duration_minutes": 30});
        store.add_group(None, json!([rule.clone(), rule]), true).await;
        let report = generator(&store, date!(2026 - 10 - 14)).generate(7).await.unwrap();
        assert_eq!(report.created, 1);
    }

    #[tokio::test]
    async fn horizon_is_bounded_above_only() {
        let store = Arc::new(MemoryStore::new());
        let rule = json!({"weekday": 3, "start_time": "10:00", "duration_minutes": 60});
        store.add_group(None, json!([rule]), true).await;
        let gen = generator(&store, date!(2026 - 10 - 14));
        assert_eq!(gen.generate(367).await.unwrap_err().code(), "DAYS_INVALID");
        assert_eq!(gen.generate(-3).await.unwrap(), GenerationReport::default());
        assert_eq!(gen.generate(0).await.unwrap().created, 1);
    }
}
