//! Library half of todocal: the task model, repeat expansion, ordering and
//! filtering, the calendar index, storage backends, and the TUI.

pub mod calendar;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod ordering;
pub mod recurrence;
pub mod remote;
pub mod storage;
pub mod tui;
