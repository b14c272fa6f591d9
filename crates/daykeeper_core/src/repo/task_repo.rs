//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Stage task inserts and flush them atomically on `save`.
//! - Query tasks by creation-time range.
//!
//! # Invariants
//! - Staged tasks are invisible to `fetch` until `save` succeeds.
//! - `save` consumes the staged batch; a failed save rolls back and discards it.
//! - `fetch` results are ordered by `created_at ASC, id ASC`.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::clock::TimeRange;
use crate::db::DbError;
use crate::model::task::{Task, TaskValidationError};
use rusqlite::{params, Connection, Row};
use std::borrow::Borrow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Unit-of-work style task store.
pub trait TaskRepository {
    /// Stages a task for the next `save`.
    fn insert(&mut self, task: Task);
    /// Persists all staged tasks and returns how many were written.
    fn save(&mut self) -> RepoResult<usize>;
    /// Returns persisted tasks whose `created_at` lies in `range`.
    fn fetch(&self, range: &TimeRange) -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task repository.
///
/// Works over a borrowed `&Connection` for short-lived use or an owned
/// `Connection` when the repository has to outlive its caller's scope.
pub struct SqliteTaskRepository<C: Borrow<Connection>> {
    conn: C,
    pending: Vec<Task>,
}

impl<C: Borrow<Connection>> SqliteTaskRepository<C> {
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            pending: Vec::new(),
        }
    }

    /// Number of staged, unsaved tasks.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn conn(&self) -> &Connection {
        self.conn.borrow()
    }
}

impl<C: Borrow<Connection>> TaskRepository for SqliteTaskRepository<C> {
    fn insert(&mut self, task: Task) {
        self.pending.push(task);
    }

    fn save(&mut self) -> RepoResult<usize> {
        // The batch is consumed whether or not it commits.
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return Ok(0);
        }
        for task in &batch {
            task.validate()?;
        }

        let tx = self.conn().unchecked_transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO tasks (id, name, created_at) VALUES (?1, ?2, ?3);")?;
            for task in &batch {
                stmt.execute(params![
                    task.id.to_string(),
                    task.name.as_str(),
                    task.created_at
                ])?;
            }
        }
        tx.commit()?;

        let written = batch.len();
        log::debug!("event=task_save module=repo status=ok count={written}");
        Ok(written)
    }

    fn fetch(&self, range: &TimeRange) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, created_at
             FROM tasks
             WHERE created_at >= ?1 AND created_at < ?2
             ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query(params![range.start_ms, range.end_ms])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{id_text}` in tasks.id")))?;
    let name: String = row.get("name")?;
    let created_at: i64 = row.get("created_at")?;

    Task::with_id(id, name, created_at).map_err(|err| {
        RepoError::InvalidData(format!("task `{id_text}` failed validation: {err}"))
    })
}
