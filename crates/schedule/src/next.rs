//! Timezone-aware next-run-time search.
//!
//! The search walks forward month → day → hour → minute, jumping the
//! candidate to the start of the next matching unit whenever a field does
//! not match, until all five fields agree. It works on wall-clock values in
//! the schedule's timezone and converts back to UTC at the end.
//!
//! **DST handling:**
//! - Spring-forward gaps: a scheduled hour that does not exist is run in the
//!   hour the clock jumps to, unless that hour is itself scheduled.
//! - Fall-back overlaps: wall times resolve to the earlier instant.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::clock::{TimeSource, TimezoneContext};
use crate::field::FieldKind;
use crate::model::Schedule;

/// Unix timestamp of 2222-01-01T00:00:00Z.
const NEVER_TIMESTAMP: i64 = 7_952_342_400;

/// Give up once the candidate is this many calendar years past the start.
/// Eight years covers a Feb-29 schedule across a skipped century leap year.
const MAX_SEARCH_YEARS: i32 = 8;

/// Instant returned for a schedule that can never fire.
pub fn never() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(NEVER_TIMESTAMP, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Exactly the sentinel; real fire times after 2222 are not "never".
pub fn is_never(instant: DateTime<Utc>) -> bool {
    instant == never()
}

/// Smallest element `>= current`, wrapping to the first element. Returns 0
/// for an empty set; callers must rule that case out beforehand.
pub fn next_at_or_after(current: u32, sorted: &BTreeSet<u32>) -> u32 {
    sorted
        .range(current..)
        .next()
        .or_else(|| sorted.first())
        .copied()
        .unwrap_or(0)
}

/// Next instant strictly after the minute containing `now` at which
/// `schedule` fires, or [`never()`] if it cannot fire.
pub fn next_run_time(
    schedule: &Schedule,
    now: DateTime<Utc>,
    tz: &TimezoneContext,
) -> DateTime<Utc> {
    if let Some(kind) = FieldKind::ALL
        .into_iter()
        .find(|kind| !schedule.is_valid_field(*kind))
    {
        debug!(
            task = schedule.task_id(),
            field = kind.name(),
            expression = %schedule.expression(kind),
            "field matches nothing; schedule never runs"
        );
        return never();
    }

    let search = Search {
        schedule,
        tz: *tz,
    };
    match search.run(tz.local(now)) {
        Some(next) => next.with_timezone(&Utc),
        None => {
            warn!(
                task = schedule.task_id(),
                cron = %schedule,
                timezone = tz.name(),
                "no fire time within {MAX_SEARCH_YEARS} years; schedule never runs"
            );
            never()
        }
    }
}

/// [`next_run_time`] with "now" taken from `clock`.
pub fn next_run_time_from(
    schedule: &Schedule,
    clock: &dyn TimeSource,
    tz: &TimezoneContext,
) -> DateTime<Utc> {
    next_run_time(schedule, clock.now(), tz)
}

/// Up to `n` consecutive fire times after `after`. Stops early if the
/// schedule can never fire.
pub fn next_run_times(
    schedule: &Schedule,
    after: DateTime<Utc>,
    tz: &TimezoneContext,
    n: usize,
) -> Vec<DateTime<Utc>> {
    let mut results = Vec::with_capacity(n);
    let mut cursor = after;
    for _ in 0..n {
        let next = next_run_time(schedule, cursor, tz);
        if is_never(next) {
            break;
        }
        results.push(next);
        cursor = next;
    }
    results
}

struct Search<'a> {
    schedule: &'a Schedule,
    tz: TimezoneContext,
}

impl Search<'_> {
    fn values(&self, kind: FieldKind) -> &BTreeSet<u32> {
        self.schedule.values(kind)
    }

    fn run(&self, start: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let first_year = start.year();
        let mut candidate = start;
        // The minute containing `start` has already begun, so a match on it
        // does not count.
        let mut first_pass = true;

        loop {
            if candidate.year() - first_year > MAX_SEARCH_YEARS {
                return None;
            }

            // ── Month ────────────────────────────────────────────────
            let month = candidate.month();
            let next_month = next_at_or_after(month, self.values(FieldKind::Month));
            if next_month != month {
                let year = if next_month < month {
                    candidate.year() + 1
                } else {
                    candidate.year()
                };
                candidate = self.start_of_day(NaiveDate::from_ymd_opt(year, next_month, 1)?)?;
                first_pass = false;
                continue;
            }

            // ── Day ──────────────────────────────────────────────────
            let offset = self.day_offset(&candidate);
            if offset != 0 {
                let date = candidate
                    .date_naive()
                    .checked_add_signed(Duration::days(i64::from(offset)))?;
                candidate = self.start_of_day(date)?;
                first_pass = false;
                continue;
            }

            // ── Hour ─────────────────────────────────────────────────
            let hours = self.values(FieldKind::Hour);
            let hour = candidate.hour();
            let next_hour = next_at_or_after(hour, hours);
            if next_hour != hour {
                let mut date = candidate.date_naive();
                if next_hour < hour {
                    date = date.succ_opt()?;
                }
                let wall = date.and_hms_opt(next_hour, 0, 0)?;
                let target = self.tz.resolve_local(wall)?;
                first_pass = false;

                // A gap-resolved hour that is not scheduled itself and stays
                // on the same day is kept: the run happens in the hour the
                // clock jumped to instead of being skipped for a day.
                let keep_current = self.tz.is_in_gap(wall)
                    && !hours.contains(&target.hour())
                    && target.date_naive() == date;
                candidate = target;
                if !keep_current {
                    continue;
                }
                debug!(
                    task = self.schedule.task_id(),
                    skipped_hour = next_hour,
                    run_hour = target.hour(),
                    "scheduled hour falls in a DST gap"
                );
            }

            // ── Minute ───────────────────────────────────────────────
            candidate = truncate_to_minute(candidate)?;
            let minute = candidate.minute();
            let next_minute = next_at_or_after(minute, self.values(FieldKind::Minute));
            if next_minute == minute && first_pass {
                candidate = candidate.checked_add_signed(Duration::minutes(1))?;
                first_pass = false;
                continue;
            }
            if next_minute < minute {
                candidate =
                    candidate.checked_add_signed(Duration::minutes(i64::from(60 - minute)))?;
                first_pass = false;
                continue;
            }
            return candidate.checked_add_signed(Duration::minutes(i64::from(next_minute - minute)));
        }
    }

    /// Days from `candidate` to the next matching day, honouring the
    /// day-of-month / day-of-week OR rule.
    fn day_offset(&self, candidate: &DateTime<Tz>) -> u32 {
        let by_day_of_month = || {
            let day = candidate.day();
            let next = next_at_or_after(day, self.values(FieldKind::Day));
            if next >= day {
                next - day
            } else {
                days_in_month(candidate.year(), candidate.month()) - day + next
            }
        };
        let by_day_of_week = || {
            let weekday = candidate.weekday().num_days_from_sunday();
            let next = next_at_or_after(weekday, self.values(FieldKind::DayOfWeek));
            if next >= weekday {
                next - weekday
            } else {
                7 - weekday + next
            }
        };

        let dom_any = self.schedule.field(FieldKind::Day).is_any();
        let dow_any = self.schedule.field(FieldKind::DayOfWeek).is_any();
        if dow_any {
            by_day_of_month()
        } else if dom_any {
            by_day_of_week()
        } else {
            by_day_of_month().min(by_day_of_week())
        }
    }

    fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Tz>> {
        self.tz.resolve_local(date.and_hms_opt(0, 0, 0)?)
    }
}

/// Drop seconds and sub-seconds by instant arithmetic. Rebuilding from
/// calendar fields is not unique inside a fall-back overlap.
fn truncate_to_minute(dt: DateTime<Tz>) -> Option<DateTime<Tz>> {
    dt.checked_sub_signed(Duration::seconds(i64::from(dt.second())))?
        .checked_sub_signed(Duration::nanoseconds(i64::from(dt.nanosecond())))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn schedule(cron: &str) -> Schedule {
        cron.parse().unwrap()
    }

    fn next_utc(cron: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        next_run_time(&schedule(cron), now, &TimezoneContext::utc())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    #[test]
    fn never_is_year_2222() {
        assert_eq!(never(), utc(2222, 1, 1, 0, 0, 0));
        assert!(is_never(never()));
        assert!(!is_never(utc(2221, 12, 31, 23, 59, 0)));
        assert!(!is_never(utc(2300, 6, 1, 12, 0, 0)));
    }

    #[test]
    fn fire_times_after_2222_are_returned() {
        let s = schedule("0 12 * * *");
        let times = next_run_times(&s, utc(2300, 6, 1, 0, 0, 0), &TimezoneContext::utc(), 2);
        assert_eq!(times, vec![utc(2300, 6, 1, 12, 0, 0), utc(2300, 6, 2, 12, 0, 0)]);
    }

    #[test]
    fn end_of_representable_time_returns_never() {
        let tz = TimezoneContext::utc();
        assert_eq!(next_run_time(&schedule("* * * * *"), DateTime::<Utc>::MAX_UTC, &tz), never());
        assert_eq!(next_run_time(&schedule("0 * * * *"), DateTime::<Utc>::MAX_UTC, &tz), never());
    }

    #[test]
    fn next_at_or_after_wraps_and_handles_empty() {
        let set: BTreeSet<u32> = [5, 10, 20].into_iter().collect();
        assert_eq!(next_at_or_after(0, &set), 5);
        assert_eq!(next_at_or_after(10, &set), 10);
        assert_eq!(next_at_or_after(11, &set), 20);
        assert_eq!(next_at_or_after(21, &set), 5);
        assert_eq!(next_at_or_after(3, &BTreeSet::new()), 0);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    // ── Basic search ─────────────────────────────────────────────────

    #[test]
    fn top_of_next_hour() {
        assert_eq!(
            next_utc("0 * * * *", utc(2024, 6, 15, 14, 32, 0)),
            utc(2024, 6, 15, 15, 0, 0)
        );
    }

    #[test]
    fn later_minute_same_hour() {
        assert_eq!(
            next_utc("45 * * * *", utc(2024, 6, 15, 14, 32, 10)),
            utc(2024, 6, 15, 14, 45, 0)
        );
    }

    #[test]
    fn every_minute_is_strictly_later() {
        assert_eq!(
            next_utc("* * * * *", utc(2024, 6, 15, 14, 32, 0)),
            utc(2024, 6, 15, 14, 33, 0)
        );
        assert_eq!(
            next_utc("* * * * *", utc(2024, 6, 15, 14, 32, 59)),
            utc(2024, 6, 15, 14, 33, 0)
        );
    }

    #[test]
    fn exact_match_moves_forward() {
        let now = utc(2024, 6, 15, 9, 30, 0);
        let next = next_utc("30 9 * * *", now);
        assert!(next > now);
        assert_eq!(next, utc(2024, 6, 16, 9, 30, 0));
    }

    #[test]
    fn first_of_next_month() {
        // July has 31 days.
        assert_eq!(
            next_utc("0 0 1 * *", utc(2024, 7, 5, 12, 0, 0)),
            utc(2024, 8, 1, 0, 0, 0)
        );
    }

    #[test]
    fn wraps_to_next_year() {
        assert_eq!(
            next_utc("0 0 1 1 *", utc(2024, 3, 1, 0, 0, 0)),
            utc(2025, 1, 1, 0, 0, 0)
        );
        assert_eq!(
            next_utc("59 23 31 12 *", utc(2024, 12, 31, 23, 59, 0)),
            utc(2025, 12, 31, 23, 59, 0)
        );
    }

    #[test]
    fn day_31_skips_short_months() {
        assert_eq!(
            next_utc("0 12 31 * *", utc(2024, 4, 5, 0, 0, 0)),
            utc(2024, 5, 31, 12, 0, 0)
        );
    }

    #[test]
    fn hour_wraps_to_next_day() {
        assert_eq!(
            next_utc("15 3 * * *", utc(2024, 6, 15, 22, 0, 0)),
            utc(2024, 6, 16, 3, 15, 0)
        );
    }

    #[test]
    fn step_and_range_fields() {
        assert_eq!(
            next_utc("*/15 9-17 * * *", utc(2024, 6, 15, 17, 46, 0)),
            utc(2024, 6, 16, 9, 0, 0)
        );
        assert_eq!(
            next_utc("*/15 9-17 * * *", utc(2024, 6, 15, 12, 1, 0)),
            utc(2024, 6, 15, 12, 15, 0)
        );
    }

    // ── Day-of-month / day-of-week ───────────────────────────────────

    #[test]
    fn day_of_week_only() {
        // Sat 2024-06-15 → Mon 2024-06-17
        assert_eq!(
            next_utc("0 9 * * 1", utc(2024, 6, 15, 10, 0, 0)),
            utc(2024, 6, 17, 9, 0, 0)
        );
    }

    #[test]
    fn sunday_as_seven() {
        // Sat 2024-06-15 → Sun 2024-06-16
        assert_eq!(
            next_utc("0 9 * * 7", utc(2024, 6, 15, 10, 0, 0)),
            utc(2024, 6, 16, 9, 0, 0)
        );
    }

    #[test]
    fn both_day_fields_restricted_use_or() {
        // From Wed 2024-05-01: next Monday is the 6th, next 15th is the 15th.
        assert_eq!(
            next_utc("0 0 15 * 1", utc(2024, 5, 1, 12, 0, 0)),
            utc(2024, 5, 6, 0, 0, 0)
        );
        // From Tue 2024-10-08: the 15th is a Tuesday, Monday the 14th comes first.
        assert_eq!(
            next_utc("0 0 15 * 1", utc(2024, 10, 8, 12, 0, 0)),
            utc(2024, 10, 14, 0, 0, 0)
        );
        // From Mon 2024-10-14 noon: the 15th beats next Monday (21st).
        assert_eq!(
            next_utc("0 0 15 * 1", utc(2024, 10, 14, 12, 0, 0)),
            utc(2024, 10, 15, 0, 0, 0)
        );
    }

    #[test]
    fn feb_29_waits_for_leap_year() {
        assert_eq!(
            next_utc("0 0 29 2 *", utc(2024, 3, 1, 0, 0, 0)),
            utc(2028, 2, 29, 0, 0, 0)
        );
        // 2100 is not a leap year; 2096 → 2104 is eight years.
        assert_eq!(
            next_utc("0 0 29 2 *", utc(2096, 3, 1, 0, 0, 0)),
            utc(2104, 2, 29, 0, 0, 0)
        );
    }

    // ── Never ────────────────────────────────────────────────────────

    #[test]
    fn empty_field_never_runs() {
        assert_eq!(next_utc("70 * * * *", utc(2024, 6, 15, 0, 0, 0)), never());
        assert_eq!(next_utc("0 1- * * *", utc(2024, 6, 15, 0, 0, 0)), never());
        assert_eq!(next_utc("* * 0 * *", utc(2024, 6, 15, 0, 0, 0)), never());
    }

    #[test]
    fn impossible_date_never_runs() {
        assert_eq!(next_utc("0 0 30 2 *", utc(2024, 1, 1, 0, 0, 0)), never());
        assert_eq!(next_utc("0 0 31 4,6,9,11 *", utc(2024, 1, 1, 0, 0, 0)), never());
    }

    #[test]
    fn next_run_times_returns_consecutive_runs() {
        let s = schedule("0 */6 * * *");
        let runs = next_run_times(&s, utc(2024, 6, 15, 1, 0, 0), &TimezoneContext::utc(), 4);
        assert_eq!(
            runs,
            vec![
                utc(2024, 6, 15, 6, 0, 0),
                utc(2024, 6, 15, 12, 0, 0),
                utc(2024, 6, 15, 18, 0, 0),
                utc(2024, 6, 16, 0, 0, 0),
            ]
        );
        let never_runs = next_run_times(
            &schedule("* 24 * * *"),
            utc(2024, 6, 15, 1, 0, 0),
            &TimezoneContext::utc(),
            3,
        );
        assert!(never_runs.is_empty());
    }

    // ── Timezones ────────────────────────────────────────────────────

    #[test]
    fn evaluated_in_timezone() {
        let tz = TimezoneContext::new(chrono_tz::America::New_York);
        // 9 ET = 13 UTC (EDT is UTC-4)
        assert_eq!(
            next_run_time(&schedule("0 9 * * *"), utc(2024, 6, 15, 12, 0, 0), &tz),
            utc(2024, 6, 15, 13, 0, 0)
        );
    }

    #[test]
    fn spring_forward_runs_in_jumped_hour() {
        let tz = TimezoneContext::new(chrono_tz::America::New_York);
        // 2024-03-10 02:00 EST → 03:00 EDT. 02:30 does not exist that day.
        let next = next_run_time(&schedule("30 2 * * *"), utc(2024, 3, 10, 5, 0, 0), &tz);
        // 03:30 EDT = 07:30 UTC
        assert_eq!(next, utc(2024, 3, 10, 7, 30, 0));
        // The following day runs at 02:30 EDT again.
        let after = next_run_time(&schedule("30 2 * * *"), next, &tz);
        assert_eq!(after, utc(2024, 3, 11, 6, 30, 0));
    }

    #[test]
    fn spring_forward_does_not_duplicate_scheduled_hour() {
        let tz = TimezoneContext::new(chrono_tz::America::New_York);
        // Both 2 and 3 scheduled: 02:00 does not exist, 03:00 EDT is the run.
        let next = next_run_time(&schedule("0 2,3 * * *"), utc(2024, 3, 10, 5, 0, 0), &tz);
        assert_eq!(next, utc(2024, 3, 10, 7, 0, 0));
        let after = next_run_time(&schedule("0 2,3 * * *"), next, &tz);
        assert_eq!(after, utc(2024, 3, 11, 6, 0, 0));
    }

    #[test]
    fn fall_back_takes_first_occurrence() {
        let tz = TimezoneContext::new(chrono_tz::America::New_York);
        // 2024-11-03 01:30 happens twice; the first is 05:30 UTC (EDT).
        let next = next_run_time(&schedule("30 1 * * *"), utc(2024, 11, 3, 4, 0, 0), &tz);
        assert_eq!(next, utc(2024, 11, 3, 5, 30, 0));
    }

    #[test]
    fn hourly_across_fall_back() {
        let tz = TimezoneContext::new(chrono_tz::America::New_York);
        let runs = next_run_times(&schedule("0 * * * *"), utc(2024, 11, 3, 4, 30, 0), &tz, 3);
        // 01:00 EDT, 01:00 EST, 02:00 EST
        assert_eq!(
            runs,
            vec![
                utc(2024, 11, 3, 5, 0, 0),
                utc(2024, 11, 3, 6, 0, 0),
                utc(2024, 11, 3, 7, 0, 0),
            ]
        );
    }
}
