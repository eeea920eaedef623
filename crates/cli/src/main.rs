use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ck_cli::cli::{self, Cli, Command, ConfigCommand};
use ck_domain::config::{LogFormat, LoggingConfig};
use ck_schedule::SystemClock;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = cli::load_config()?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Next {
            cron,
            task,
            count,
            tz,
            from,
        } => cli::next::run(
            &config,
            cron.as_deref(),
            task.as_deref(),
            count,
            tz.as_deref(),
            from.as_deref(),
        ),
        Command::Check { cron } => match cli::next::check(&cron) {
            Ok(msg) => {
                println!("{msg}");
                Ok(())
            }
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(1);
            }
        },
        Command::Tasks => cli::tasks::list(&config, &SystemClock),
        Command::Enable { task } => cli::tasks::enable(&config, &task, true),
        Command::Disable { task } => cli::tasks::enable(&config, &task, false),
        Command::Reset { task } => cli::tasks::reset(&config, &task),
        Command::Config(ConfigCommand::Validate) => {
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => cli::config::show(&config),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
/// `RUST_LOG` overrides `logging.filter`.
fn init_tracing(cfg: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.filter));

    match cfg.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}
