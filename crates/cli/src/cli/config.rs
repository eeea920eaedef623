use ck_domain::config::{Config, ConfigError, ConfigSeverity};
use ck_schedule::validate_task_defaults;

/// Structural checks plus per-task cron checks.
pub fn issues(config: &Config) -> Vec<ConfigError> {
    let mut issues = config.validate();
    issues.extend(validate_task_defaults(config));
    issues
}

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when errors are found; warnings alone pass.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = issues(config);

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
    print!("{output}");
    Ok(())
}
