//! Flutter-facing bindings for DayKeeper.
//!
//! `api` is the only module exposed to Dart; bridge glue is generated from it.

pub mod api;
