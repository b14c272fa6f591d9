//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own the single process-wide coordinator, its scheduler runtime and the
//!   task list view model the host renders.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Exactly one `TimeManager` exists per process; it is built lazily on the
//!   first call that needs it and lives until process exit.
//! - Coordinator wake-ups run on one dedicated scheduler thread.
//! - Day, task list and countdown state reach the host only through the
//!   view model.

use chrono::{Local, TimeZone};
use daykeeper_core::db::{open_db, open_db_in_memory};
use daykeeper_core::{
    core_version as core_version_inner, format_time, init_logging as init_logging_inner,
    ping as ping_inner, start_of_day, Clock, CoreConfig, MemoryTimestampStore, ScenePhase,
    SqliteTaskRepository, SqliteTimestampStore, SystemClock, Task, TaskListViewModel, TaskService,
    TimeManager, TimestampStore,
};
use log::error;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::runtime::Runtime;

const SCHEDULER_THREAD_NAME: &str = "daykeeper-scheduler";
static APP_ROOT: OnceLock<Result<Mutex<AppRoot>, String>> = OnceLock::new();

type HostViewModel = TaskListViewModel<SqliteTaskRepository<Connection>>;

/// Process-wide owner of the coordinator and the view model fed by it.
struct AppRoot {
    view_model: HostViewModel,
    manager: TimeManager,
    // Declared last so the coordinator is dropped before its runtime.
    _runtime: Runtime,
}

impl AppRoot {
    fn build() -> Result<Self, String> {
        let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(SCHEDULER_THREAD_NAME)
            .enable_time()
            .build()
            .map_err(|err| format!("scheduler runtime start failed: {err}"))?;

        let store: Arc<dyn TimestampStore> = match SqliteTimestampStore::open(&config.db_path) {
            Ok(store) => Arc::new(store),
            Err(err) => {
                error!(
                    "event=app_root_init module=ffi status=degraded error_code=store_open_failed error={err}"
                );
                Arc::new(MemoryTimestampStore::new())
            }
        };
        let task_conn = open_task_connection(&config)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let manager = TimeManager::start(
            runtime.handle().clone(),
            clock.clone(),
            store,
            config.timer_settings(),
        );
        let view_model = TaskListViewModel::new(
            TaskService::new(SqliteTaskRepository::new(task_conn)),
            clock,
            &manager,
        );

        Ok(Self {
            view_model,
            manager,
            _runtime: runtime,
        })
    }
}

fn open_task_connection(config: &CoreConfig) -> Result<Connection, String> {
    match open_db(&config.db_path) {
        Ok(conn) => Ok(conn),
        Err(err) => {
            error!(
                "event=app_root_init module=ffi status=degraded error_code=task_db_open_failed error={err}"
            );
            open_db_in_memory().map_err(|err| format!("task DB open failed: {err}"))
        }
    }
}

fn with_app_root<T>(f: impl FnOnce(&mut AppRoot) -> T) -> Result<T, String> {
    let root = APP_ROOT
        .get_or_init(|| AppRoot::build().map(Mutex::new))
        .as_ref()
        .map_err(|err| format!("app root unavailable: {err}"))?;
    let mut guard = root.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(f(&mut guard))
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// View state after applying coordinator events published since the
/// previous poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEventsResponse {
    /// Whether any visible state changed during this poll.
    pub changed: bool,
    /// Selected day start in epoch milliseconds.
    pub selected_day_epoch_ms: i64,
    /// Remaining countdown in whole seconds.
    pub remaining_seconds: u64,
    /// `remaining_seconds` formatted as `MM:SS` / `HH:MM:SS`.
    pub remaining_text: String,
    /// Human-readable diagnostics; empty on success.
    pub message: String,
}

/// One task row for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub task_id: String,
    pub name: String,
    pub created_at_ms: i64,
}

/// Task list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub items: Vec<TaskItem>,
    /// Start of the listed day in epoch milliseconds.
    pub day_epoch_ms: i64,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    pub ok: bool,
    pub task_id: Option<String>,
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, task_id: String) -> Self {
        Self {
            ok: true,
            task_id: Some(task_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task_id: None,
            message: message.into(),
        }
    }
}

/// Starts (or restarts) the countdown for `seconds`.
///
/// Negative values are treated as zero, i.e. an already expired countdown.
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn timer_start_countdown(seconds: i64) -> String {
    let duration = Duration::from_secs(u64::try_from(seconds).unwrap_or(0));
    match with_app_root(|root| root.manager.start_countdown(duration)) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Whole seconds left on the persisted countdown; zero when none.
#[flutter_rust_bridge::frb(sync)]
pub fn timer_remaining_seconds() -> u64 {
    with_app_root(|root| root.manager.remaining_time_since_start().as_secs()).unwrap_or(0)
}

/// Formats seconds as `MM:SS` below one hour and `HH:MM:SS` above.
#[flutter_rust_bridge::frb(sync)]
pub fn timer_format(seconds: u64) -> String {
    format_time(Duration::from_secs(seconds))
}

/// Stops live ticks; the countdown itself keeps running.
#[flutter_rust_bridge::frb(sync)]
pub fn timer_stop_live() -> String {
    match with_app_root(|root| root.manager.stop_live_timer()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Start of the current day in epoch milliseconds.
#[flutter_rust_bridge::frb(sync)]
pub fn current_day_epoch_ms() -> i64 {
    with_app_root(|root| root.manager.current_day().timestamp_millis())
        .unwrap_or_else(|_| start_of_day(&Local::now()).timestamp_millis())
}

/// Forwards a host lifecycle transition (`active|inactive|background`).
///
/// On `active` the view model re-syncs its selected day and remaining time.
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn app_scene_phase(phase: String) -> String {
    let Some(phase) = ScenePhase::parse(&phase) else {
        return format!("unsupported scene phase `{}`", phase.trim());
    };
    match with_app_root(|root| root.view_model.on_scene_phase(phase, &mut root.manager)) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Applies coordinator events published since the previous poll and
/// returns the resulting view state.
#[flutter_rust_bridge::frb(sync)]
pub fn timer_poll_events() -> TimerEventsResponse {
    let polled = with_app_root(|root| {
        let changed = root.view_model.pump();
        (
            changed,
            root.view_model.selected_date().timestamp_millis(),
            root.view_model.remaining(),
        )
    });

    match polled {
        Ok((changed, selected_day_epoch_ms, remaining)) => TimerEventsResponse {
            changed,
            selected_day_epoch_ms,
            remaining_seconds: remaining.as_secs(),
            remaining_text: format_time(remaining),
            message: String::new(),
        },
        Err(err) => TimerEventsResponse {
            changed: false,
            selected_day_epoch_ms: 0,
            remaining_seconds: 0,
            remaining_text: format_time(Duration::ZERO),
            message: err,
        },
    }
}

/// Creates the default task for the selected day.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_create_default_task() -> EntryActionResponse {
    match with_app_root(|root| root.view_model.create_default_task()) {
        Ok(Some(task_id)) => EntryActionResponse::success("Task created.", task_id.to_string()),
        Ok(None) => EntryActionResponse::failure(
            "entry_create_default_task failed; see core logs for details",
        ),
        Err(err) => EntryActionResponse::failure(err),
    }
}

/// Lists the selected day's tasks.
///
/// With `day_epoch_ms`, the day containing that instant becomes the
/// selected day first.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_for_day(day_epoch_ms: Option<i64>) -> TaskListResponse {
    let select = match day_epoch_ms {
        None => None,
        Some(ms) => match Local.timestamp_millis_opt(ms).single() {
            Some(at) => Some(at),
            None => return task_list_failure(ms, format!("invalid day timestamp `{ms}`")),
        },
    };

    let listed = with_app_root(|root| {
        if let Some(at) = select {
            root.view_model.set_selected_date(at);
        }
        let items = root
            .view_model
            .tasks()
            .iter()
            .map(to_task_item)
            .collect::<Vec<_>>();
        (root.view_model.selected_date().timestamp_millis(), items)
    });

    match listed {
        Ok((day_epoch_ms, items)) => {
            let message = if items.is_empty() {
                "No tasks.".to_string()
            } else {
                format!("Found {} task(s).", items.len())
            };
            TaskListResponse {
                items,
                day_epoch_ms,
                message,
            }
        }
        Err(err) => task_list_failure(day_epoch_ms.unwrap_or(0), err),
    }
}

fn task_list_failure(day_epoch_ms: i64, message: String) -> TaskListResponse {
    TaskListResponse {
        items: Vec::new(),
        day_epoch_ms,
        message,
    }
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        task_id: task.id.to_string(),
        name: task.name.clone(),
        created_at_ms: task.created_at,
    }
}
