// Core layer - shared types, configuration and errors
pub mod core;

// Persistence - entity store trait and its backends
pub mod database;

// Features layer - intents and reminders
pub mod features;

// Request boundary - HTTP routes
pub mod http;

// Notification channel - WebSocket fan-out to connected clients
pub mod ipc;

pub use core::Config;
pub use database::{EntityStore, MemoryStore, Reminder, SqliteStore, Task};
pub use features::{IntentDispatcher, IntentResult, ReminderScheduler, UndoStack};
pub use ipc::{NotificationChannel, NotificationHub};
