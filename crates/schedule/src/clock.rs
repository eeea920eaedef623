//! Time source and timezone context injected into the next-run search.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use ck_domain::{Error, Result};

/// Supplies "now" when the caller does not pin an instant.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The timezone cron fields are evaluated in.
///
/// Passed explicitly to every calculation; nothing in this crate reads a
/// process-wide timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimezoneContext {
    tz: Tz,
}

impl Default for TimezoneContext {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimezoneContext {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: chrono_tz::UTC }
    }

    /// Parse an IANA name such as `America/New_York`.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| Error::InvalidTimezone(name.to_string()))
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// Map a wall-clock time to an instant.
    ///
    /// Ambiguous times (clocks going back) take the earlier instant. Times
    /// inside a forward gap are read with the offset in force before the
    /// gap, which lands them the gap's width later on the wall clock
    /// (02:30 in a 02:00→03:00 gap becomes 03:30).
    pub fn resolve_local(&self, wall: NaiveDateTime) -> Option<DateTime<Tz>> {
        match self.tz.from_local_datetime(&wall) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
            LocalResult::None => self.resolve_gap(wall),
        }
    }

    /// True when `wall` does not exist on the local clock.
    pub fn is_in_gap(&self, wall: NaiveDateTime) -> bool {
        matches!(self.tz.from_local_datetime(&wall), LocalResult::None)
    }

    fn resolve_gap(&self, wall: NaiveDateTime) -> Option<DateTime<Tz>> {
        // A day earlier is safely before the transition.
        let probe = wall.checked_sub_signed(Duration::days(1))?;
        let before = self.tz.offset_from_utc_datetime(&probe).fix();
        let utc = wall.checked_sub_signed(Duration::seconds(i64::from(before.local_minus_utc())))?;
        Some(self.tz.from_utc_datetime(&utc))
    }
}
