pub mod config;
pub mod next;
pub mod tasks;

use clap::{Parser, Subcommand};

/// cronkit — compute when cron-scheduled tasks run next.
#[derive(Debug, Parser)]
#[command(name = "cronkit", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print upcoming fire times for a cron line or a configured task.
    Next {
        /// Cron line (`minute hour day month day_of_week`). Omit when using --task.
        cron: Option<String>,
        /// Task id from the config (applies any stored override).
        #[arg(long, conflicts_with = "cron")]
        task: Option<String>,
        /// How many fire times to print.
        #[arg(long, short = 'n', default_value_t = 5)]
        count: usize,
        /// IANA timezone (defaults to `scheduler.timezone`).
        #[arg(long)]
        tz: Option<String>,
        /// Start from this RFC 3339 instant instead of now.
        #[arg(long)]
        from: Option<String>,
    },
    /// Check that a cron line is well formed and can fire.
    Check {
        /// Cron line to check.
        cron: String,
    },
    /// List configured tasks with their effective schedule and next run.
    Tasks,
    /// Enable a task (stored as an override).
    Enable {
        /// Task id from the config.
        task: String,
    },
    /// Disable a task (stored as an override).
    Disable {
        /// Task id from the config.
        task: String,
    },
    /// Drop a task's override and go back to its configured default.
    Reset {
        /// Task id from the config.
        task: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `CK_CONFIG` (or
/// `cronkit.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used. A missing file yields the defaults.
///
/// [`Config`]: ck_domain::config::Config
pub fn load_config() -> anyhow::Result<(ck_domain::config::Config, String)> {
    let config_path = std::env::var("CK_CONFIG").unwrap_or_else(|_| "cronkit.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<ck_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(ck_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_next_with_options() {
        let cli = Cli::try_parse_from([
            "cronkit", "next", "0 * * * *", "-n", "3", "--tz", "Europe/Berlin",
        ])
        .unwrap();
        match cli.command {
            Command::Next { cron, task, count, tz, from } => {
                assert_eq!(cron.as_deref(), Some("0 * * * *"));
                assert!(task.is_none());
                assert_eq!(count, 3);
                assert_eq!(tz.as_deref(), Some("Europe/Berlin"));
                assert!(from.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cron_and_task_conflict() {
        assert!(Cli::try_parse_from(["cronkit", "next", "* * * * *", "--task", "backup"]).is_err());
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.scheduler.timezone, "UTC");
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn malformed_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[scheduler\n").unwrap();
        let err = load_config_from(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
