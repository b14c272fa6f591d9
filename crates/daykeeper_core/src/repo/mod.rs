//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for tasks and the countdown timestamp.
//! - Isolate SQLite query details from service and timer code.
//!
//! # Invariants
//! - Task writes enforce `Task::validate()` before persistence.

pub mod task_repo;
pub mod timestamp_store;
