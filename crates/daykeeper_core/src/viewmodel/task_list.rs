//! Day task list view model.
//!
//! # Responsibility
//! - Keep the selected day in step with coordinator day changes.
//! - Expose the selected day's tasks and the formatted countdown.
//!
//! # Invariants
//! - `selected_date` is always a start of day.
//! - Task store failures are logged and leave the previous list in place.

use crate::clock::{start_of_day, Clock, DayStart};
use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::TaskRepository;
use crate::service::task_service::TaskService;
use crate::timer::format::format_time;
use crate::timer::lifecycle::ScenePhase;
use crate::timer::manager::TimeManager;
use crate::timer::subscription::Subscription;
use log::{error, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct TaskListViewModel<R: TaskRepository> {
    service: TaskService<R>,
    clock: Arc<dyn Clock>,
    selected_date: DayStart,
    tasks: Vec<Task>,
    remaining: Duration,
    day_changes: Subscription<DayStart>,
    remaining_changes: Subscription<Duration>,
}

impl<R: TaskRepository> TaskListViewModel<R> {
    /// Subscribes to `manager` and loads the state for its current day.
    pub fn new(service: TaskService<R>, clock: Arc<dyn Clock>, manager: &TimeManager) -> Self {
        let mut view_model = Self {
            service,
            clock,
            selected_date: manager.current_day(),
            tasks: Vec::new(),
            remaining: manager.remaining_time_since_start(),
            day_changes: manager.subscribe_day_changes(),
            remaining_changes: manager.subscribe_remaining(),
        };
        view_model.reload_tasks();
        view_model
    }

    pub fn selected_date(&self) -> DayStart {
        self.selected_date
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn remaining_text(&self) -> String {
        format_time(self.remaining)
    }

    /// Selects the day containing `date` and reloads its tasks.
    pub fn set_selected_date(&mut self, date: DayStart) {
        self.selected_date = start_of_day(&date);
        self.reload_tasks();
    }

    /// Creates the default task for the selected day.
    ///
    /// Returns `None` when the store rejected the write.
    pub fn create_default_task(&mut self) -> Option<TaskId> {
        match self.service.create_default_task(&self.selected_date) {
            Ok(id) => {
                self.reload_tasks();
                Some(id)
            }
            Err(err) => {
                error!(
                    "event=task_create module=viewmodel status=error day={} error={err}",
                    self.selected_date
                );
                None
            }
        }
    }

    /// Applies every event published since the last call.
    ///
    /// Returns whether any visible state changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        if let Some(day) = self.day_changes.latest() {
            if day != self.selected_date {
                self.set_selected_date(day);
                changed = true;
            }
        }
        if let Some(remaining) = self.remaining_changes.latest() {
            changed |= remaining != self.remaining;
            self.remaining = remaining;
        }
        changed
    }

    /// Waits for the next coordinator event and applies it.
    ///
    /// Returns `false` once the coordinator is gone.
    pub async fn next_event(&mut self) -> bool {
        tokio::select! {
            day = self.day_changes.recv() => match day {
                Some(day) => {
                    self.set_selected_date(day);
                    true
                }
                None => false,
            },
            remaining = self.remaining_changes.recv() => match remaining {
                Some(remaining) => {
                    self.remaining = remaining;
                    true
                }
                None => false,
            },
        }
    }

    /// Forwards a lifecycle transition and resynchronizes on foreground.
    pub fn on_scene_phase(&mut self, phase: ScenePhase, manager: &mut TimeManager) {
        manager.handle_scene_phase(phase);
        if phase != ScenePhase::Active {
            return;
        }

        let today = start_of_day(&self.clock.now());
        if today != self.selected_date {
            self.set_selected_date(today);
        }
        self.remaining = manager.remaining_time_since_start();
    }

    fn reload_tasks(&mut self) {
        match self.service.tasks_for_day(&self.selected_date) {
            Ok(tasks) => self.tasks = tasks,
            Err(err) => warn!(
                "event=task_fetch module=viewmodel status=error day={} error={err}",
                self.selected_date
            ),
        }
    }
}
