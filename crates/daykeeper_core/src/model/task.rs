//! Task domain model.
//!
//! # Responsibility
//! - Define the record persisted per calendar day.
//! - Validate identity and naming before persistence.
//!
//! # Invariants
//! - `id` is never nil.
//! - `name` is non-empty after trimming.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Validation errors for task invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    NilId,
    EmptyName,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "task id must not be nil"),
            Self::EmptyName => write!(f, "task name must not be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// One task row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskWire")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

#[derive(Deserialize)]
struct TaskWire {
    id: TaskId,
    name: String,
    created_at: i64,
}

impl TryFrom<TaskWire> for Task {
    type Error = TaskValidationError;

    fn try_from(value: TaskWire) -> Result<Self, Self::Error> {
        Task::with_id(value.id, value.name, value.created_at)
    }
}

impl Task {
    /// Creates a task with a generated id.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank.
    pub fn new(name: impl Into<String>, created_at: i64) -> Result<Self, TaskValidationError> {
        Self::with_id(Uuid::new_v4(), name, created_at)
    }

    /// Creates a task with a caller-provided id (used when reading rows back).
    pub fn with_id(
        id: TaskId,
        name: impl Into<String>,
        created_at: i64,
    ) -> Result<Self, TaskValidationError> {
        let task = Self {
            id,
            name: name.into(),
            created_at,
        };
        task.validate()?;
        Ok(task)
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_nil() {
            return Err(TaskValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(TaskValidationError::EmptyName);
        }
        Ok(())
    }
}
