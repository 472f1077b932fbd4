//! # Features
//!
//! - `intents`: utterance-driven to-do and reminder actions
//! - `reminders`: due-reminder scheduling and the undo stack

pub mod intents;
pub mod reminders;

pub use intents::{DetectRequest, DialogflowClient, IntentDetector, IntentDispatcher, IntentResult};
pub use reminders::{ReminderScheduler, UndoStack};
