use std::fmt;

use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use time_tz::{timezones, Offset, TimeZone, Tz};

/// The single wall-clock zone a deployment computes "today" and recurrence rules in.
#[derive(Clone)]
pub struct LocalZone {
    tz: &'static Tz,
    name: String,
}

impl fmt::Debug for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalZone").field(&self.name).finish()
    }
}

impl LocalZone {
    /// Looks up an IANA zone name such as `Europe/Vienna`.
    pub fn named(name: &str) -> Option<Self> {
        timezones::get_by_name(name).map(|tz| Self {
            tz,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        self.tz.get_offset_utc(&instant).to_utc()
    }

    pub fn now(&self) -> OffsetDateTime {
        self.localize(OffsetDateTime::now_utc())
    }

    pub fn today(&self) -> Date {
        self.now().date()
    }

    /// Re-expresses an instant in this zone's local offset.
    pub fn localize(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant.to_offset(self.offset_at(instant))
    }

    /// Resolves a local wall-clock time to an instant.
    ///
    /// A time that occurs twice (clocks turned back) resolves to its first
    /// occurrence; a time inside a spring-forward gap is read with the offset
    /// in effect before the transition.
    pub fn at(&self, date: Date, time: Time) -> OffsetDateTime {
        let local = PrimitiveDateTime::new(date, time);
        let naive = local.assume_utc();
        let before = self.offset_at(naive.checked_sub(Duration::hours(12)).unwrap_or(naive));
        let after = self.offset_at(naive.checked_add(Duration::hours(12)).unwrap_or(naive));

        [before, after]
            .into_iter()
            .map(|offset| local.assume_offset(offset))
            .filter(|instant| self.offset_at(*instant) == instant.offset())
            .min()
            .unwrap_or_else(|| local.assume_offset(before))
    }

    /// Local midnight at the start of `date`.
    pub fn start_of(&self, date: Date) -> OffsetDateTime {
        self.at(date, Time::MIDNIGHT)
    }
}
