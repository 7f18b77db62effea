use std::collections::HashMap;

use sqlx::PgPool;
use time::{Date, Duration};
use tracing::debug;

use super::{
    dto::{DashboardRange, DashboardResponse, DashboardTable, DashboardTotals, DashboardWeek, TableRow},
    repo::{self, DayCount, PaymentDay, Series},
};
use crate::{
    error::{AppError, AppResult},
    lessons::{generator::ScheduleConfig, services::date_range_window},
};

pub const MAX_DAYS: i64 = 366;

const USERS: Series = Series { table: "users", column: "created_at" };
const GROUPS: Series = Series { table: "groups", column: "created_at" };
const STUDENTS: Series = Series { table: "students", column: "created_at" };
const LESSONS_CREATED: Series = Series { table: "lessons", column: "created_at" };
const LESSONS_STARTING: Series = Series { table: "lessons", column: "starts_at" };
const PARTICIPATIONS: Series = Series { table: "lesson_participation", column: "updated_at" };
const MATERIALS: Series = Series { table: "materials", column: "created_at" };
const NOTIFICATIONS: Series = Series { table: "notifications", column: "created_at" };
const DEVICE_TOKENS: Series = Series { table: "device_tokens", column: "created_at" };
const MANAGERS: Series = Series { table: "managers", column: "created_at" };

/// The last `days` local days, today included.
pub fn range_ending(today: Date, days: i64, timezone: &str) -> AppResult<DashboardRange> {
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(AppError::bad_request("DAYS_INVALID", "days must be between 1 and 366"));
    }
    Ok(DashboardRange {
        from_date: today - Duration::days(days - 1),
        to_date: today,
        days,
        timezone: timezone.to_string(),
    })
}

fn dates(range: &DashboardRange) -> Vec<Date> {
    let mut out = Vec::with_capacity(range.days as usize);
    let mut day = range.from_date;
    while day <= range.to_date {
        out.push(day);
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}

/// Day buckets as fetched; missing days read as zero.
#[derive(Debug, Default)]
pub struct Daily(HashMap<Date, i64>);

impl Daily {
    pub fn get(&self, day: Date) -> i64 {
        self.0.get(&day).copied().unwrap_or(0)
    }

    pub fn sum(&self) -> i64 {
        self.0.values().sum()
    }
}

impl FromIterator<DayCount> for Daily {
    fn from_iter<I: IntoIterator<Item = DayCount>>(iter: I) -> Self {
        Self(iter.into_iter().map(|d| (d.day, d.count)).collect())
    }
}

/// Everything the weekly report is assembled from.
#[derive(Debug, Default)]
pub struct WeeklyData {
    pub totals: DashboardTotals,
    pub users: Daily,
    pub groups: Daily,
    pub students: Daily,
    pub lessons_created: Daily,
    pub lessons_starting: Daily,
    pub participations: Daily,
    pub materials: Daily,
    pub notifications: Daily,
    pub payments: Vec<PaymentDay>,
    pub device_tokens: Daily,
    pub managers: Daily,
}

fn count_table(name: &'static str, days: &[Date], data: &Daily) -> DashboardTable {
    DashboardTable {
        name,
        rows: days
            .iter()
            .map(|&date| TableRow {
                count: Some(data.get(date)),
                ..TableRow::on(date)
            })
            .collect(),
    }
}

/// Zero-fills every table over the range and derives the week sums.
pub fn assemble(range: DashboardRange, data: WeeklyData) -> DashboardResponse {
    let days = dates(&range);
    let payments: HashMap<Date, PaymentDay> = data.payments.iter().map(|p| (p.day, *p)).collect();
    let paid = |f: fn(&PaymentDay) -> i64| data.payments.iter().map(f).sum::<i64>();

    let week = DashboardWeek {
        users_created: data.users.sum(),
        groups_created: data.groups.sum(),
        students_created: data.students.sum(),
        lessons_created: data.lessons_created.sum(),
        lessons_starting: data.lessons_starting.sum(),
        lesson_participations_updated: data.participations.sum(),
        materials_created: data.materials.sum(),
        notifications_created: data.notifications.sum(),
        payments_created: paid(|p| p.count),
        payments_amount_cents: paid(|p| p.amount_cents),
        payments_paid: paid(|p| p.paid_count),
        payments_paid_amount_cents: paid(|p| p.paid_amount_cents),
        device_tokens_created: data.device_tokens.sum(),
        managers_created: data.managers.sum(),
    };

    let lessons = DashboardTable {
        name: "lessons_by_day",
        rows: days
            .iter()
            .map(|&date| TableRow {
                created: Some(data.lessons_created.get(date)),
                starting: Some(data.lessons_starting.get(date)),
                ..TableRow::on(date)
            })
            .collect(),
    };

    let payments_table = DashboardTable {
        name: "payments_by_day",
        rows: days
            .iter()
            .map(|&date| {
                let p = payments.get(&date);
                TableRow {
                    count: Some(p.map_or(0, |p| p.count)),
                    amount_cents: Some(p.map_or(0, |p| p.amount_cents)),
                    paid_count: Some(p.map_or(0, |p| p.paid_count)),
                    paid_amount_cents: Some(p.map_or(0, |p| p.paid_amount_cents)),
                    ..TableRow::on(date)
                }
            })
            .collect(),
    };

    let tables = vec![
        count_table("users_by_day", &days, &data.users),
        count_table("groups_by_day", &days, &data.groups),
        count_table("students_by_day", &days, &data.students),
        lessons,
        count_table("lesson_participations_by_day", &days, &data.participations),
        count_table("materials_by_day", &days, &data.materials),
        count_table("notifications_by_day", &days, &data.notifications),
        payments_table,
        count_table("device_tokens_by_day", &days, &data.device_tokens),
        count_table("managers_by_day", &days, &data.managers),
    ];

    DashboardResponse {
        range,
        totals: data.totals,
        week,
        tables,
    }
}

async fn totals(db: &PgPool) -> anyhow::Result<DashboardTotals> {
    let by_type: HashMap<String, i64> = repo::users_by_type(db).await?.into_iter().collect();
    Ok(DashboardTotals {
        users: repo::total(db, "users").await?,
        users_admin: by_type.get("admin").copied().unwrap_or(0),
        users_parent: by_type.get("parent").copied().unwrap_or(0),
        groups: repo::total(db, "groups").await?,
        students: repo::total(db, "students").await?,
        lessons: repo::total(db, "lessons").await?,
        lesson_participations: repo::total(db, "lesson_participation").await?,
        materials: repo::total(db, "materials").await?,
        notifications: repo::total(db, "notifications").await?,
        payments: repo::total(db, "payments").await?,
        device_tokens: repo::total(db, "device_tokens").await?,
        managers: repo::total(db, "managers").await?,
    })
}

pub async fn weekly(db: &PgPool, schedule: &ScheduleConfig, days: i64) -> AppResult<DashboardResponse> {
    let zone = &schedule.zone;
    let range = range_ending(schedule.today(), days, zone.name())?;
    let window = date_range_window(zone, range.from_date, range.to_date)?;
    let (tz, start, end) = (zone.name(), window.start, window.end);

    let daily = move |series: Series| async move {
        repo::daily(db, series, tz, start, end)
            .await
            .map(|rows| rows.into_iter().collect::<Daily>())
    };

    let data = WeeklyData {
        totals: totals(db).await?,
        users: daily(USERS).await?,
        groups: daily(GROUPS).await?,
        students: daily(STUDENTS).await?,
        lessons_created: daily(LESSONS_CREATED).await?,
        lessons_starting: daily(LESSONS_STARTING).await?,
        participations: daily(PARTICIPATIONS).await?,
        materials: daily(MATERIALS).await?,
        notifications: daily(NOTIFICATIONS).await?,
        payments: repo::daily_payments(db, tz, start, end).await?,
        device_tokens: daily(DEVICE_TOKENS).await?,
        managers: daily(MANAGERS).await?,
    };
    debug!(from = %range.from_date, to = %range.to_date, "dashboard assembled");
    Ok(assemble(range, data))
}
