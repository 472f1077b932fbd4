//! In-memory entity store
//!
//! Backs `DATABASE_PATH=:memory:`-style ephemeral runs and the scheduler/dispatcher tests.
//! Insertion order is preserved for listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EntityStore, Reminder, Task};
use crate::core::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    reminders: RwLock<Vec<Reminder>>,
    tasks: RwLock<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_reminder(
        &self,
        message: &str,
        due_at: DateTime<Utc>,
    ) -> Result<Reminder, StoreError> {
        let reminder = Reminder::new(message, due_at)?;
        self.reminders.write().await.push(reminder.clone());
        Ok(reminder)
    }

    async fn find_due_reminders(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        let mut due: Vec<Reminder> = self
            .reminders
            .read()
            .await
            .iter()
            .filter(|r| r.due_at <= as_of)
            .cloned()
            .collect();
        due.sort_by_key(|r| r.due_at);
        Ok(due)
    }

    async fn save_reminder(&self, reminder: &Reminder) -> Result<bool, StoreError> {
        let mut reminders = self.reminders.write().await;
        match reminders.iter_mut().find(|r| r.id == reminder.id) {
            Some(stored) => {
                stored.last_notified_at = reminder.last_notified_at;
                stored.notify_count = reminder.notify_count;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_reminder_by_message(&self, message: &str) -> Result<bool, StoreError> {
        let mut reminders = self.reminders.write().await;
        let earliest = reminders
            .iter()
            .enumerate()
            .filter(|(_, r)| r.message == message)
            .min_by_key(|(_, r)| r.due_at)
            .map(|(index, _)| index);
        match earliest {
            Some(index) => {
                reminders.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_reminder(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut reminders = self.reminders.write().await;
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        Ok(reminders.len() != before)
    }

    async fn list_reminders(&self) -> Result<Vec<Reminder>, StoreError> {
        Ok(self.reminders.read().await.clone())
    }

    async fn create_task(&self, description: &str) -> Result<Task, StoreError> {
        let task = Task::new(description, Utc::now())?;
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn delete_task_by_description(&self, description: &str) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.iter().position(|t| t.description == description) {
            Some(index) => {
                tasks.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() != before)
    }

    async fn delete_all_tasks(&self) -> Result<u64, StoreError> {
        let mut tasks = self.tasks.write().await;
        let count = tasks.len() as u64;
        tasks.clear();
        Ok(count)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_due_reminders_sorted_and_bounded() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.create_reminder("later", now + Duration::hours(1)).await.unwrap();
        store.create_reminder("second", now - Duration::minutes(1)).await.unwrap();
        store.create_reminder("first", now - Duration::minutes(10)).await.unwrap();

        let due = store.find_due_reminders(now).await.unwrap();
        let messages: Vec<&str> = due.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_by_message_removes_one() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.create_reminder("dup", now).await.unwrap();
        store.create_reminder("dup", now).await.unwrap();

        assert!(store.delete_reminder_by_message("dup").await.unwrap());
        assert_eq!(store.list_reminders().await.unwrap().len(), 1);
        assert!(!store.delete_reminder_by_message("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_after_delete_reports_missing() {
        let store = MemoryStore::new();
        let mut reminder = store.create_reminder("gone", Utc::now()).await.unwrap();
        reminder.notify_count = 1;
        assert!(store.save_reminder(&reminder).await.unwrap());

        store.delete_reminder(reminder.id).await.unwrap();
        reminder.notify_count = 2;
        assert!(!store.save_reminder(&reminder).await.unwrap());
        assert!(store.list_reminders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_task_lifecycle() {
        let store = MemoryStore::new();
        let milk = store.create_task("buy milk").await.unwrap();
        store.create_task("walk dog").await.unwrap();

        assert!(store.delete_task(milk.id).await.unwrap());
        assert!(!store.delete_task(milk.id).await.unwrap());
        assert!(!store.delete_task_by_description("buy milk").await.unwrap());
        assert_eq!(store.delete_all_tasks().await.unwrap(), 1);
        assert!(store.list_tasks().await.unwrap().is_empty());
    }
}
