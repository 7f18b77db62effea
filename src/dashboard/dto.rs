use serde::{Deserialize, Serialize};
use time::Date;

use crate::serde_fmt;

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRange {
    #[serde(with = "serde_fmt::date")]
    pub from_date: Date,
    #[serde(with = "serde_fmt::date")]
    pub to_date: Date,
    pub days: i64,
    pub timezone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardTotals {
    pub users: i64,
    pub users_admin: i64,
    pub users_parent: i64,
    pub groups: i64,
    pub students: i64,
    pub lessons: i64,
    pub lesson_participations: i64,
    pub materials: i64,
    pub notifications: i64,
    pub payments: i64,
    pub device_tokens: i64,
    pub managers: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardWeek {
    pub users_created: i64,
    pub groups_created: i64,
    pub students_created: i64,
    pub lessons_created: i64,
    pub lessons_starting: i64,
    pub lesson_participations_updated: i64,
    pub materials_created: i64,
    pub notifications_created: i64,
    pub payments_created: i64,
    pub payments_amount_cents: i64,
    pub payments_paid: i64,
    pub payments_paid_amount_cents: i64,
    pub device_tokens_created: i64,
    pub managers_created: i64,
}

/// One day of a table; only the columns that table reports are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    #[serde(with = "serde_fmt::date")]
    pub date: Date,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount_cents: Option<i64>,
}

impl TableRow {
    pub fn on(date: Date) -> Self {
        Self {
            date,
            count: None,
            created: None,
            starting: None,
            amount_cents: None,
            paid_count: None,
            paid_amount_cents: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardTable {
    pub name: &'static str,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardResponse {
    pub range: DashboardRange,
    pub totals: DashboardTotals,
    pub week: DashboardWeek,
    pub tables: Vec<DashboardTable>,
}
