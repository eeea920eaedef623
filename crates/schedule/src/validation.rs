//! Input validation for cron lines, timezones and configured task defaults.
//!
//! The evaluator itself never reports errors (a bad field just matches
//! nothing); these helpers turn that into messages a user can act on.

use ck_domain::config::{Config, ConfigError, ConfigSeverity, TaskDefaults};

use crate::field::FieldKind;
use crate::model::Schedule;
use crate::next::{is_never, next_run_time};
use crate::TimezoneContext;

/// Validate an IANA timezone string.
pub fn validate_timezone(tz: &str) -> Result<(), String> {
    if tz.parse::<chrono_tz::Tz>().is_err() {
        Err(format!(
            "invalid timezone: '{}'; use IANA names like 'America/New_York' or 'UTC'",
            tz
        ))
    } else {
        Ok(())
    }
}

/// Validate a 5-field cron line. `R` is accepted in any field.
pub fn validate_cron(cron: &str) -> Result<(), String> {
    let fields: Vec<&str> = cron.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!(
            "expected 5 fields (minute hour day month day_of_week), got {}",
            fields.len()
        ));
    }
    for (kind, field) in FieldKind::ALL.into_iter().zip(fields) {
        validate_field(kind, field)?;
    }
    Ok(())
}

fn validate_field(kind: FieldKind, expression: &str) -> Result<(), String> {
    if expression.trim() == "R" {
        return Ok(());
    }
    let schedule = Schedule::new("").with_field(kind, expression);
    if schedule.is_valid_field(kind) {
        Ok(())
    } else {
        let (min, max) = kind.declared_range();
        Err(format!(
            "{}: '{}' matches nothing; expected *, N, N-M, lists and /steps within {}..={}",
            kind, expression, min, max
        ))
    }
}

fn task_fields(task: &TaskDefaults) -> [(FieldKind, &str); 5] {
    [
        (FieldKind::Minute, task.minute.as_str()),
        (FieldKind::Hour, task.hour.as_str()),
        (FieldKind::Day, task.day.as_str()),
        (FieldKind::Month, task.month.as_str()),
        (FieldKind::DayOfWeek, task.day_of_week.as_str()),
    ]
}

/// Check every `[tasks.<id>]` entry: each field must match something, and
/// the combination must be able to fire (no Feb 30).
pub fn validate_task_defaults(config: &Config) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let tz = TimezoneContext::parse(&config.scheduler.timezone).unwrap_or_default();

    for (id, task) in &config.tasks {
        let mut fields_ok = true;
        for (kind, expression) in task_fields(task) {
            if let Err(message) = validate_field(kind, expression) {
                fields_ok = false;
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("tasks.{id}.{kind}"),
                    message,
                });
            }
        }
        if !fields_ok {
            continue;
        }

        // `R` needs a concrete value before the combination can be checked;
        // any value in range will do for that.
        let mut schedule = Schedule::new(id.as_str());
        for (kind, expression) in task_fields(task) {
            let concrete = if expression.trim() == "R" {
                kind.semantic_range().0.to_string()
            } else {
                expression.to_string()
            };
            schedule.set_field(kind, &concrete);
        }
        // Any reference instant works: a satisfiable schedule fires within
        // eight years of every starting point.
        let reference = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
        if is_never(next_run_time(&schedule, reference, &tz)) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: format!("tasks.{id}"),
                message: format!("schedule '{schedule}' can never fire"),
            });
        }
    }

    errors
}
