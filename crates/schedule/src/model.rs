//! The schedule value object: five cron fields plus lifecycle flags.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Timelike, Utc};
use ck_domain::Error;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::TimezoneContext;
use crate::field::{expand_random, Field, FieldExpr, FieldKind};

fn default_component() -> String {
    "core".into()
}

/// When a task runs, and whether it may.
///
/// Fields start as `*` and are overwritten by the setters; each setter drops
/// the field's cached value set. `customised` is not kept in sync
/// automatically: recompute it through
/// [`ScheduleLifecycle`](crate::ScheduleLifecycle) after changing fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schedule {
    task_id: String,
    #[serde(default = "default_component")]
    component: String,
    #[serde(default)]
    minute: Field,
    #[serde(default)]
    hour: Field,
    #[serde(default)]
    day: Field,
    #[serde(default)]
    month: Field,
    #[serde(default)]
    day_of_week: Field,
    #[serde(default)]
    disabled: bool,
    /// Fields or `disabled` differ from the registered default.
    #[serde(default)]
    customised: bool,
    /// Values come from external configuration rather than code defaults.
    #[serde(default)]
    overridden: bool,
    /// Set by the execution layer after a successful run.
    #[serde(default)]
    last_run_time: Option<DateTime<Utc>>,
    /// Run even when the owning component is disabled.
    #[serde(default)]
    run_if_component_disabled: bool,
}

impl Schedule {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            component: default_component(),
            minute: Field::default(),
            hour: Field::default(),
            day: Field::default(),
            month: Field::default(),
            day_of_week: Field::default(),
            disabled: false,
            customised: false,
            overridden: false,
            last_run_time: None,
            run_if_component_disabled: false,
        }
    }

    /// Build a schedule from a 5-field cron line, expanding `R` with `rng`.
    pub fn from_cron<R: Rng>(
        task_id: impl Into<String>,
        cron: &str,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let parts: Vec<&str> = cron.split_whitespace().collect();
        if parts.len() != FieldKind::ALL.len() {
            return Err(Error::Other(format!(
                "expected 5 fields (minute hour day month day_of_week), got {}",
                parts.len()
            )));
        }
        let mut schedule = Self::new(task_id);
        for (kind, expression) in FieldKind::ALL.into_iter().zip(parts) {
            schedule.set_field_with_rng(kind, expression, rng);
        }
        Ok(schedule)
    }

    /// Builder form of [`Schedule::set_field`].
    pub fn with_field(mut self, kind: FieldKind, expression: &str) -> Self {
        self.set_field(kind, expression);
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    // ── Fields ───────────────────────────────────────────────────────

    pub fn field(&self, kind: FieldKind) -> &Field {
        match kind {
            FieldKind::Minute => &self.minute,
            FieldKind::Hour => &self.hour,
            FieldKind::Day => &self.day,
            FieldKind::Month => &self.month,
            FieldKind::DayOfWeek => &self.day_of_week,
        }
    }

    fn field_mut(&mut self, kind: FieldKind) -> &mut Field {
        match kind {
            FieldKind::Minute => &mut self.minute,
            FieldKind::Hour => &mut self.hour,
            FieldKind::Day => &mut self.day,
            FieldKind::Month => &mut self.month,
            FieldKind::DayOfWeek => &mut self.day_of_week,
        }
    }

    /// Expression text of a field, e.g. `"*/15"`.
    pub fn expression(&self, kind: FieldKind) -> String {
        self.field(kind).to_string()
    }

    /// Set a field from expression text. `R` is replaced by a random value
    /// from the field's calendar range.
    pub fn set_field(&mut self, kind: FieldKind, expression: &str) {
        self.set_field_with_rng(kind, expression, &mut rand::thread_rng());
    }

    /// Like [`Schedule::set_field`] with a caller-supplied random source.
    pub fn set_field_with_rng<R: Rng>(&mut self, kind: FieldKind, expression: &str, rng: &mut R) {
        let (min, max) = kind.semantic_range();
        let expression = expand_random(expression, min, max, rng);
        *self.field_mut(kind) = Field::parse(&expression);
    }

    /// Set a field to an explicit value set.
    pub fn set_values(&mut self, kind: FieldKind, values: BTreeSet<u32>) {
        *self.field_mut(kind) = Field::new(FieldExpr::Values(values));
    }

    /// Evaluated values of a field (cached until the field is next set).
    pub fn values(&self, kind: FieldKind) -> &BTreeSet<u32> {
        self.field(kind).values(kind)
    }

    /// A field is valid when it matches at least one value.
    pub fn is_valid_field(&self, kind: FieldKind) -> bool {
        !self.values(kind).is_empty()
    }

    /// String-keyed form of [`Schedule::is_valid_field`]. An unknown field
    /// name is a caller bug and is reported as [`Error::UnknownField`].
    pub fn is_valid_field_named(&self, name: &str) -> Result<bool, Error> {
        Ok(self.is_valid_field(name.parse()?))
    }

    /// True when every field can match something.
    pub fn is_satisfiable(&self) -> bool {
        FieldKind::ALL.iter().all(|kind| self.is_valid_field(*kind))
    }

    // ── Flags ────────────────────────────────────────────────────────

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn is_customised(&self) -> bool {
        self.customised
    }

    pub fn set_customised(&mut self, customised: bool) {
        self.customised = customised;
    }

    pub fn is_overridden(&self) -> bool {
        self.overridden
    }

    pub fn set_overridden(&mut self, overridden: bool) {
        self.overridden = overridden;
    }

    pub fn run_if_component_disabled(&self) -> bool {
        self.run_if_component_disabled
    }

    pub fn set_run_if_component_disabled(&mut self, run: bool) {
        self.run_if_component_disabled = run;
    }

    pub fn last_run_time(&self) -> Option<DateTime<Utc>> {
        self.last_run_time
    }

    pub fn set_last_run_time(&mut self, at: Option<DateTime<Utc>>) {
        self.last_run_time = at;
    }

    // ── Comparison & matching ────────────────────────────────────────

    /// Same five field expressions and the same `disabled` flag as `default`.
    pub fn matches_default(&self, default: &Schedule) -> bool {
        FieldKind::ALL
            .iter()
            .all(|kind| self.field(*kind) == default.field(*kind))
            && self.disabled == default.disabled
    }

    /// Whether the minute containing `instant` is a fire time.
    ///
    /// Day-of-month and day-of-week combine the cron way: when both are
    /// restricted, either one matching is enough.
    pub fn matches(&self, instant: DateTime<Utc>, tz: &TimezoneContext) -> bool {
        let local = tz.local(instant);
        let day_of_month = self.values(FieldKind::Day).contains(&local.day());
        let day_of_week = self
            .values(FieldKind::DayOfWeek)
            .contains(&local.weekday().num_days_from_sunday());
        let day_ok = if self.day_of_week.is_any() {
            day_of_month
        } else if self.day.is_any() {
            day_of_week
        } else {
            day_of_month || day_of_week
        };

        day_ok
            && self.values(FieldKind::Minute).contains(&local.minute())
            && self.values(FieldKind::Hour).contains(&local.hour())
            && self.values(FieldKind::Month).contains(&local.month())
    }
}

/// Cron-line form: `minute hour day month day_of_week`.
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day, self.month, self.day_of_week
        )
    }
}

/// Parse a cron line into an anonymous schedule (empty task id).
impl FromStr for Schedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schedule::from_cron("", s, &mut rand::thread_rng())
    }
}
