//! Day rollover and countdown timing.
//!
//! # Responsibility
//! - Own the coordinator that decides which calendar day is in effect.
//! - Drive the single persisted countdown and its live display ticks.

pub mod format;
pub mod lifecycle;
pub mod manager;
pub mod subscription;
