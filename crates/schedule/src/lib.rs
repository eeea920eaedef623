//! Cron schedule core: field-expression evaluation, next-run-time search and
//! the mutable [`Schedule`] value with its enable/disable lifecycle.
//!
//! Split into submodules:
//! - [`field`] — field kinds, the expression evaluator, `R` expansion
//! - [`model`] — the `Schedule` value object
//! - [`next`] — timezone-aware next-run-time search
//! - [`clock`] — time source and timezone context
//! - [`lifecycle`] — enable/disable against injected collaborators
//! - [`validation`] — human-readable checks for cron lines and config

pub mod clock;
pub mod field;
pub mod lifecycle;
pub mod model;
pub mod next;
pub mod validation;

pub use clock::{FixedClock, SystemClock, TimeSource, TimezoneContext};
pub use field::{evaluate_field, expand_random, Field, FieldExpr, FieldKind};
pub use lifecycle::{
    ComponentStatus, DefaultScheduleRegistry, ScheduleLifecycle, SchedulePersistence,
};
pub use model::Schedule;
pub use next::{
    is_never, never, next_at_or_after, next_run_time, next_run_time_from, next_run_times,
};
pub use validation::{validate_cron, validate_task_defaults, validate_timezone};
