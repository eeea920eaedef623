mod logging;
mod scheduler;
mod tasks;

pub use logging::*;
pub use scheduler::*;
pub use tasks::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Out-of-the-box schedule for each task (key = task id).
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDefaults>,
    /// Component enablement (key = component name). Components that are
    /// not listed are treated as enabled.
    #[serde(default)]
    pub components: BTreeMap<String, bool>,
}

impl Config {
    /// Whether `component` is enabled. Unlisted components are enabled.
    pub fn component_enabled(&self, component: &str) -> bool {
        self.components.get(component).copied().unwrap_or(true)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Only structural checks live here. Whether each task's cron fields can
    /// ever fire is checked by `ck_schedule::validation::validate_task_defaults`,
    /// which owns the field evaluator.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.scheduler.timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "scheduler.timezone".into(),
                message: format!(
                    "'{}' is not an IANA timezone (e.g. 'Europe/London', 'UTC')",
                    self.scheduler.timezone
                ),
            });
        }

        if self.scheduler.overrides_path.as_os_str().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "scheduler.overrides_path".into(),
                message: "overrides_path must not be empty".into(),
            });
        }

        if self.tasks.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "tasks".into(),
                message: "no tasks configured".into(),
            });
        }

        for (id, task) in &self.tasks {
            if id.trim().is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "tasks".into(),
                    message: "task id must not be empty".into(),
                });
            }
            if task.component.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("tasks.{id}.component"),
                    message: "component must not be empty".into(),
                });
            } else if !self.components.is_empty() && !self.components.contains_key(&task.component)
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("tasks.{id}.component"),
                    message: format!(
                        "component '{}' is not listed in [components]; assuming enabled",
                        task.component
                    ),
                });
            }
        }

        errors
    }
}
