//! UI-ready state holders fed by the coordinator and the task store.

pub mod task_list;
