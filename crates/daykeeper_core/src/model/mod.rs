//! Domain model for day tasks.
//!
//! # Invariants
//! - Every task is identified by a stable, non-nil `TaskId`.
//! - A task belongs to the calendar day containing its `created_at`.

pub mod task;
