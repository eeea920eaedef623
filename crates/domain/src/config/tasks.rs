use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task default schedules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Out-of-the-box schedule for one task.
///
/// Each field is a cron field expression (`*`, `*/15`, `1-5`, `3,7,9`) or
/// `R` for a random value picked once per task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskDefaults {
    /// Component the task belongs to.
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_field")]
    pub minute: String,
    #[serde(default = "default_field")]
    pub hour: String,
    #[serde(default = "default_field")]
    pub day: String,
    #[serde(default = "default_field")]
    pub month: String,
    #[serde(default = "default_field")]
    pub day_of_week: String,
    #[serde(default)]
    pub disabled: bool,
    /// Run the task even when its component is disabled.
    #[serde(default)]
    pub run_if_component_disabled: bool,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            component: default_component(),
            minute: default_field(),
            hour: default_field(),
            day: default_field(),
            month: default_field(),
            day_of_week: default_field(),
            disabled: false,
            run_if_component_disabled: false,
        }
    }
}

fn default_component() -> String {
    "core".into()
}

fn default_field() -> String {
    "*".into()
}
