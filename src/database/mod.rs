//! # Database
//!
//! Persistence contract for reminders and to-do tasks, with a SQLite backend and an
//! in-memory backend.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: `EntityStore` trait with SQLite and memory implementations
//! - 1.0.0: Initial reminder table

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A time-based reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: Uuid,
    pub message: String,
    pub due_at: DateTime<Utc>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub notify_count: u32,
}

/// A to-do list entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(message: &str, due_at: DateTime<Utc>) -> Result<Self, StoreError> {
        non_empty("reminder", "message", message)?;
        Ok(Reminder {
            id: Uuid::new_v4(),
            message: message.to_string(),
            due_at,
            last_notified_at: None,
            notify_count: 0,
        })
    }
}

impl Task {
    pub fn new(description: &str, created_at: DateTime<Utc>) -> Result<Self, StoreError> {
        non_empty("task", "description", description)?;
        Ok(Task {
            id: Uuid::new_v4(),
            description: description.to_string(),
            created_at,
        })
    }
}

fn non_empty(entity: &'static str, field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidEntity {
            entity,
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

/// Storage operations used by the dispatcher, the scheduler and the HTTP routes
///
/// Every call is an independent atomic unit. Callers treat `StoreError` as recoverable.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create_reminder(
        &self,
        message: &str,
        due_at: DateTime<Utc>,
    ) -> Result<Reminder, StoreError>;

    /// Reminders with `due_at <= as_of`, earliest first
    async fn find_due_reminders(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError>;

    /// Persist the notification bookkeeping of an existing reminder
    ///
    /// Returns `false` when the reminder no longer exists.
    async fn save_reminder(&self, reminder: &Reminder) -> Result<bool, StoreError>;

    /// Delete at most one reminder with this exact message
    async fn delete_reminder_by_message(&self, message: &str) -> Result<bool, StoreError>;

    async fn delete_reminder(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_reminders(&self) -> Result<Vec<Reminder>, StoreError>;

    async fn create_task(&self, description: &str) -> Result<Task, StoreError>;

    /// Delete at most one task with this exact description
    async fn delete_task_by_description(&self, description: &str) -> Result<bool, StoreError>;

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Returns the number of tasks removed
    async fn delete_all_tasks(&self) -> Result<u64, StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reminder_starts_unnotified() {
        let reminder = Reminder::new("Reminder to call mom", Utc::now()).unwrap();
        assert_eq!(reminder.notify_count, 0);
        assert!(reminder.last_notified_at.is_none());
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(Reminder::new("   ", Utc::now()).is_err());
        assert!(Task::new("", Utc::now()).is_err());
    }

    #[test]
    fn test_reminder_serializes_camel_case() {
        let reminder = Reminder::new("stretch", Utc::now()).unwrap();
        let json = serde_json::to_value(&reminder).unwrap();
        assert!(json.get("dueAt").is_some());
        assert!(json.get("notifyCount").is_some());
        assert!(json["lastNotifiedAt"].is_null());
    }
}
