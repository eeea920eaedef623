use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use ck_schedule::{
    evaluate_field, is_never, never, next_run_time, next_run_time_from, FieldKind, FixedClock,
    Schedule, TimezoneContext,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn schedule(minute: &str, hour: &str, day: &str, month: &str, dow: &str) -> Schedule {
    Schedule::new("test")
        .with_field(FieldKind::Minute, minute)
        .with_field(FieldKind::Hour, hour)
        .with_field(FieldKind::Day, day)
        .with_field(FieldKind::Month, month)
        .with_field(FieldKind::DayOfWeek, dow)
}

#[test]
fn evaluator_properties() {
    assert_eq!(evaluate_field("*", 3, 9), (3..=9).collect::<BTreeSet<u32>>());
    assert_eq!(
        evaluate_field("5/10", 0, 59),
        BTreeSet::from([5, 15, 25, 35, 45, 55])
    );
    assert_eq!(evaluate_field("10-20", 0, 23), (10..=20).collect::<BTreeSet<u32>>());
    assert!(evaluate_field("70", 0, 59).is_empty());

    let s = Schedule::new("t").with_field(FieldKind::DayOfWeek, "7");
    assert_eq!(s.values(FieldKind::DayOfWeek), &BTreeSet::from([0]));
}

#[test]
fn hourly_at_minute_zero() {
    let s = schedule("0", "*", "*", "*", "*");
    assert_eq!(
        next_run_time(&s, utc(2024, 6, 15, 14, 32), &TimezoneContext::utc()),
        utc(2024, 6, 15, 15, 0)
    );
}

#[test]
fn monthly_on_the_first() {
    let s = schedule("0", "0", "1", "*", "*");
    // January has 31 days.
    assert_eq!(
        next_run_time(&s, utc(2025, 1, 5, 8, 0), &TimezoneContext::utc()),
        utc(2025, 2, 1, 0, 0)
    );
}

#[test]
fn day_fields_combine_with_or() {
    let s = schedule("0", "0", "15", "*", "1");
    let tz = TimezoneContext::utc();
    // Wed 2025-01-08: next Monday is the 13th, before the 15th.
    assert_eq!(next_run_time(&s, utc(2025, 1, 8, 0, 0), &tz), utc(2025, 1, 13, 0, 0));
    // Tue 2025-01-14: the 15th comes before Monday the 20th.
    assert_eq!(next_run_time(&s, utc(2025, 1, 14, 0, 0), &tz), utc(2025, 1, 15, 0, 0));
}

#[test]
fn result_is_after_a_matching_now() {
    let s = schedule("*/10", "*", "*", "*", "*");
    let now = utc(2024, 6, 15, 14, 30);
    let next = next_run_time(&s, now, &TimezoneContext::utc());
    assert!(next > now);
    assert_eq!(next, utc(2024, 6, 15, 14, 40));
}

#[test]
fn empty_field_returns_never() {
    for kind in FieldKind::ALL {
        let s = Schedule::new("t").with_field(kind, "99");
        let next = next_run_time(&s, utc(2024, 6, 15, 0, 0), &TimezoneContext::utc());
        assert_eq!(next, never(), "{kind}");
        assert!(is_never(next));
    }
}

#[test]
fn clock_supplies_now() {
    let s = schedule("15", "10", "*", "*", "*");
    let clock = FixedClock(utc(2024, 6, 15, 11, 0));
    assert_eq!(
        next_run_time_from(&s, &clock, &TimezoneContext::utc()),
        utc(2024, 6, 16, 10, 15)
    );
}

#[test]
fn deterministic_random_fields() {
    let a = Schedule::from_cron("t", "R R * * R", &mut StdRng::seed_from_u64(9)).unwrap();
    let b = Schedule::from_cron("t", "R R * * R", &mut StdRng::seed_from_u64(9)).unwrap();
    assert_eq!(a.to_string(), b.to_string());
    assert!(a.is_satisfiable());

    let tz = TimezoneContext::new(chrono_tz::Europe::Berlin);
    let now = utc(2024, 6, 15, 0, 0);
    assert_eq!(next_run_time(&a, now, &tz), next_run_time(&b, now, &tz));
}

#[test]
fn timezone_changes_the_answer() {
    let s = schedule("0", "9", "*", "*", "*");
    let now = utc(2024, 1, 15, 12, 0);
    let london = TimezoneContext::parse("Europe/London").unwrap();
    let tokyo = TimezoneContext::parse("Asia/Tokyo").unwrap();
    // 09:00 GMT already passed at 12:00 UTC.
    assert_eq!(next_run_time(&s, now, &london), utc(2024, 1, 16, 9, 0));
    // 09:00 JST = 00:00 UTC.
    assert_eq!(next_run_time(&s, now, &tokyo), utc(2024, 1, 16, 0, 0));
}
