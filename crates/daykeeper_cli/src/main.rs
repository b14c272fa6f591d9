//! CLI entry point for DayKeeper.
//!
//! # Responsibility
//! - Drive the core coordinator and task store from a terminal.
//! - Keep output line-oriented so it can be scripted.

use clap::{Parser, Subcommand};
use daykeeper_core::config::{ENV_DB_PATH, ENV_LOG_DIR};
use daykeeper_core::db::open_db;
use daykeeper_core::{
    format_time, init_logging_from_config, start_of_day, Clock, CoreConfig, SqliteTaskRepository,
    SqliteTimestampStore, SystemClock, TaskService, TimeManager,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// DayKeeper: day-rollover aware task list with a persistent countdown.
#[derive(Parser)]
#[command(name = "daykeeper", version, about)]
struct Cli {
    /// SQLite database file holding tasks and the countdown endpoint.
    #[arg(long, global = true, env = ENV_DB_PATH)]
    db: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, global = true, env = ENV_LOG_DIR)]
    log_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Check that the core crate is linked.
    Ping,

    /// Start a countdown and print the remaining time until it expires.
    Countdown {
        /// Countdown length in seconds.
        #[arg(long)]
        seconds: u64,
    },

    /// Print the time left on the persisted countdown.
    Remaining,

    /// List today's tasks.
    Today {
        /// Create the default task for today before listing.
        #[arg(long)]
        create: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = resolve_config(&cli)?;
    init_logging_from_config(&config)?;

    match cli.command {
        Command::Ping => {
            println!("daykeeper_core ping={}", daykeeper_core::ping());
            println!("daykeeper_core version={}", daykeeper_core::core_version());
            Ok(())
        }
        Command::Countdown { seconds } => run_countdown(&config, seconds).await,
        Command::Remaining => show_remaining(&config),
        Command::Today { create } => list_today(&config, create),
    }
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig, String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    apply_overrides(cli, config)
}

/// Applies command-line flags on top of environment configuration.
fn apply_overrides(cli: &Cli, mut config: CoreConfig) -> Result<CoreConfig, String> {
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        if !log_dir.is_absolute() {
            return Err(format!(
                "--log-dir must be an absolute path, got `{}`",
                log_dir.display()
            ));
        }
        config.log_dir = Some(log_dir.clone());
    }
    Ok(config)
}

fn start_manager(config: &CoreConfig) -> Result<TimeManager, String> {
    let store = SqliteTimestampStore::open(&config.db_path)
        .map_err(|err| format!("failed to open `{}`: {err}", config.db_path.display()))?;
    Ok(TimeManager::start(
        Handle::current(),
        Arc::new(SystemClock),
        Arc::new(store),
        config.timer_settings(),
    ))
}

async fn run_countdown(config: &CoreConfig, seconds: u64) -> Result<(), String> {
    let mut manager = start_manager(config)?;
    let mut ticks = manager.subscribe_remaining();
    manager.start_countdown(Duration::from_secs(seconds));
    info!("event=cli_countdown module=cli status=started seconds={seconds}");

    while let Some(remaining) = ticks.recv().await {
        println!("{}", format_time(remaining));
        if remaining.is_zero() {
            break;
        }
    }
    manager.shutdown();
    Ok(())
}

fn show_remaining(config: &CoreConfig) -> Result<(), String> {
    let mut manager = start_manager(config)?;
    let remaining = manager.remaining_time_since_start();
    match manager.countdown_endpoint() {
        Some(endpoint) => println!(
            "remaining={} seconds={} endpoint={endpoint}",
            format_time(remaining),
            remaining.as_secs()
        ),
        None => println!("remaining={} (no countdown)", format_time(remaining)),
    }
    manager.shutdown();
    Ok(())
}

fn list_today(config: &CoreConfig, create: bool) -> Result<(), String> {
    let conn = open_db(&config.db_path)
        .map_err(|err| format!("failed to open `{}`: {err}", config.db_path.display()))?;
    let mut service = TaskService::new(SqliteTaskRepository::new(&conn));
    let today = start_of_day(&SystemClock.now());

    if create {
        let task_id = service
            .create_default_task(&today)
            .map_err(|err| format!("create failed: {err}"))?;
        println!("created {task_id}");
    }

    let tasks = service
        .tasks_for_day(&today)
        .map_err(|err| format!("list failed: {err}"))?;
    println!("day={} tasks={}", today.format("%Y-%m-%d"), tasks.len());
    for task in tasks {
        println!("{}\t{}", task.id, task.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_overrides, Cli, Command};
    use clap::{CommandFactory, Parser};
    use daykeeper_core::CoreConfig;
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn countdown_requires_seconds() {
        assert!(Cli::try_parse_from(["daykeeper", "countdown"]).is_err());
        let cli = Cli::try_parse_from(["daykeeper", "countdown", "--seconds", "90"]).unwrap();
        assert!(matches!(cli.command, Command::Countdown { seconds: 90 }));
    }

    #[test]
    fn today_create_flag_is_optional() {
        let cli = Cli::try_parse_from(["daykeeper", "today"]).unwrap();
        assert!(matches!(cli.command, Command::Today { create: false }));
        let cli = Cli::try_parse_from(["daykeeper", "today", "--create"]).unwrap();
        assert!(matches!(cli.command, Command::Today { create: true }));
    }

    #[test]
    fn flags_override_environment_config() {
        let cli = Cli::try_parse_from([
            "daykeeper",
            "remaining",
            "--db",
            "/var/lib/daykeeper/tasks.db",
            "--log-dir",
            "/var/log/daykeeper",
        ])
        .unwrap();

        let config = apply_overrides(&cli, CoreConfig::default()).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/daykeeper/tasks.db"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/daykeeper")));
    }

    #[test]
    fn missing_flags_keep_environment_config() {
        let cli = Cli::try_parse_from(["daykeeper", "ping"]).unwrap();
        let base = CoreConfig::default();

        let config = apply_overrides(&cli, base.clone()).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let cli = Cli::try_parse_from(["daykeeper", "today", "--log-dir", "logs"]).unwrap();

        let err = apply_overrides(&cli, CoreConfig::default()).unwrap_err();
        assert!(err.contains("absolute"), "{err}");
    }
}
