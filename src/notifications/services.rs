use time::{Duration, OffsetDateTime};

/// Start times that qualify for a reminder sent at `now`: the configured lead
/// time, give or take an hour, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub from: OffsetDateTime,
    pub to: OffsetDateTime,
}

impl ReminderWindow {
    pub fn around(now: OffsetDateTime, lead_hours: i64) -> Self {
        let center = now + Duration::hours(lead_hours);
        Self {
            from: center - Duration::hours(1),
            to: center + Duration::hours(1),
        }
    }

    #[cfg(test)]
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.from <= at && at <= self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn default_lead_covers_23_to_25_hours() {
        let now = datetime!(2026-10-18 12:00 UTC);
        let w = ReminderWindow::around(now, 24);
        assert_eq!(w.from, datetime!(2026-10-19 11:00 UTC));
        assert_eq!(w.to, datetime!(2026-10-19 13:00 UTC));
    }

    #[test]
    fn bounds_are_inclusive() {
        let w = ReminderWindow::around(datetime!(2026-10-18 12:00 UTC), 24);
        assert!(w.contains(w.from));
        assert!(w.contains(w.to));
        assert!(w.contains(datetime!(2026-10-19 12:30 UTC)));
        assert!(!w.contains(datetime!(2026-10-19 10:59 UTC)));
        assert!(!w.contains(datetime!(2026-10-19 13:00:01 UTC)));
    }

    #[test]
    fn shorter_lead_moves_window() {
        let w = ReminderWindow::around(datetime!(2026-10-18 12:00 UTC), 2);
        assert_eq!(w.from, datetime!(2026-10-18 13:00 UTC));
        assert_eq!(w.to, datetime!(2026-10-18 15:00 UTC));
    }
}
