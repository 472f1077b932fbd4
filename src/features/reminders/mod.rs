//! # Reminders Feature
//!
//! Due-reminder scanning with a bounded retry policy, plus the undo stack of recently
//! delivered reminders.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod scheduler;
pub mod undo;

pub use scheduler::{ReminderScheduler, TickReport};
pub use undo::{UndoEntry, UndoStack};
