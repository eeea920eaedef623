use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA timezone that cron fields are evaluated in.
    #[serde(default = "d_timezone")]
    pub timezone: String,
    /// JSON file holding enable/disable overrides written by the CLI.
    #[serde(default = "d_overrides_path")]
    pub overrides_path: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: d_timezone(),
            overrides_path: d_overrides_path(),
        }
    }
}

fn d_timezone() -> String {
    "UTC".into()
}

fn d_overrides_path() -> PathBuf {
    PathBuf::from("data/overrides.json")
}
