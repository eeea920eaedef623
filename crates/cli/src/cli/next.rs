//! `cronkit next` and `cronkit check`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use ck_domain::config::Config;
use ck_schedule::{
    is_never, next_run_time, next_run_times, validate_cron, FixedClock, Schedule, SystemClock,
    TimeSource, TimezoneContext,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::registry::ConfigRegistry;
use crate::store::OverrideStore;

/// `--tz` if given, else the configured scheduler timezone.
pub fn resolve_timezone(arg: Option<&str>, config: &Config) -> anyhow::Result<TimezoneContext> {
    let name = arg.unwrap_or(&config.scheduler.timezone);
    Ok(TimezoneContext::parse(name)?)
}

/// Clock pinned to `--from`, or the system clock.
pub fn resolve_clock(from: Option<&str>) -> anyhow::Result<Box<dyn TimeSource>> {
    match from {
        Some(raw) => {
            let at = DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("--from '{raw}' is not an RFC 3339 timestamp"))?;
            Ok(Box::new(FixedClock(at.with_timezone(&Utc))))
        }
        None => Ok(Box::new(SystemClock)),
    }
}

/// `2024-06-15T15:00:00Z (2024-06-15 17:00 CEST)`
pub fn format_instant(instant: DateTime<Utc>, tz: &TimezoneContext) -> String {
    format!(
        "{} ({})",
        instant.format("%Y-%m-%dT%H:%M:%SZ"),
        tz.local(instant).format("%Y-%m-%d %H:%M %Z")
    )
}

/// Schedule for `next`: an ad-hoc cron line, or a task's effective schedule.
pub fn resolve_schedule(
    cron: Option<&str>,
    task: Option<&str>,
    config: &Config,
) -> anyhow::Result<Schedule> {
    match (cron, task) {
        (Some(cron), _) => {
            validate_cron(cron).map_err(anyhow::Error::msg)?;
            Ok(Schedule::from_cron("cli", cron, &mut rand::thread_rng())?)
        }
        (None, Some(task)) => {
            let registry = ConfigRegistry::from_config(config);
            let store = OverrideStore::open(&config.scheduler.overrides_path)?;
            store
                .effective(&registry, task)
                .with_context(|| format!("unknown task '{task}'"))
        }
        (None, None) => anyhow::bail!("give a cron line or --task <id>"),
    }
}

/// Upcoming fire times as printable lines.
pub fn upcoming(
    schedule: &Schedule,
    clock: &dyn TimeSource,
    tz: &TimezoneContext,
    count: usize,
) -> Vec<String> {
    let times = next_run_times(schedule, clock.now(), tz, count);
    if times.is_empty() {
        return vec!["never".to_string()];
    }
    times.into_iter().map(|t| format_instant(t, tz)).collect()
}

pub fn run(
    config: &Config,
    cron: Option<&str>,
    task: Option<&str>,
    count: usize,
    tz: Option<&str>,
    from: Option<&str>,
) -> anyhow::Result<()> {
    let tz = resolve_timezone(tz, config)?;
    let clock = resolve_clock(from)?;
    let schedule = resolve_schedule(cron, task, config)?;

    println!("{schedule}  [{}]", tz.name());
    for line in upcoming(&schedule, clock.as_ref(), &tz, count) {
        println!("  {line}");
    }
    Ok(())
}

/// Well-formedness plus a check that the fields can ever coincide.
/// `R` is expanded with a fixed seed so the verdict is repeatable.
pub fn check(cron: &str) -> Result<String, String> {
    validate_cron(cron)?;
    let schedule = Schedule::from_cron("check", cron, &mut StdRng::seed_from_u64(0))
        .map_err(|e| e.to_string())?;
    if is_never(next_run_time(
        &schedule,
        DateTime::<Utc>::UNIX_EPOCH,
        &TimezoneContext::utc(),
    )) {
        return Err(format!("'{cron}' is well formed but can never fire"));
    }
    Ok(format!("'{cron}' OK"))
}
