//! Core domain logic for DayKeeper.
//! This crate is the single source of truth for day and countdown state.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod timer;
pub mod viewmodel;

pub use clock::{
    day_range, next_day_start, start_of_day, Clock, DayStart, ManualClock, SystemClock, TimeRange,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::task::{Task, TaskId, TaskValidationError};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use repo::timestamp_store::{
    MemoryTimestampStore, SqliteTimestampStore, StoreError, StoreResult, TimestampStore,
};
pub use service::task_service::{default_task_title, TaskService};
pub use timer::format::format_time;
pub use timer::lifecycle::ScenePhase;
pub use timer::manager::{TimeManager, TimerSettings, COUNTDOWN_ENDPOINT_KEY};
pub use timer::subscription::Subscription;
pub use viewmodel::task_list::TaskListViewModel;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
