//! Day task use-case service.
//!
//! # Responsibility
//! - Create the default task for a calendar day.
//! - List the tasks belonging to a calendar day.
//!
//! # Invariants
//! - A default task is named after its day (`dd/MM/yyyy`) and stamped with
//!   the day start, so it always lands inside that day's range.

use crate::clock::{day_range, start_of_day, DayStart};
use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::{RepoResult, TaskRepository};

const DEFAULT_TASK_TITLE_FORMAT: &str = "%d/%m/%Y";

/// Use-case service over a task repository.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates and saves the default task for `day`.
    pub fn create_default_task(&mut self, day: &DayStart) -> RepoResult<TaskId> {
        let day_start = start_of_day(day);
        let task = Task::new(default_task_title(&day_start), day_start.timestamp_millis())?;
        let id = task.id;

        self.repo.insert(task);
        self.repo.save()?;
        log::info!("event=task_create module=service status=ok task_id={id} day={day_start}");
        Ok(id)
    }

    /// Returns saved tasks created within `day`, oldest first.
    pub fn tasks_for_day(&self, day: &DayStart) -> RepoResult<Vec<Task>> {
        self.repo.fetch(&day_range(day))
    }
}

/// Title of the default task for `day`, e.g. `12/08/2025`.
pub fn default_task_title(day: &DayStart) -> String {
    day.format(DEFAULT_TASK_TITLE_FORMAT).to_string()
}
