//! SQLite entity store
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Timestamps are stored as unix milliseconds so the due query is a plain integer comparison.
//! Identifiers are UUID v4 strings. Every statement runs on tokio's blocking pool behind a
//! single connection lock.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use sqlite::{ConnectionThreadSafe, State, Statement};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{EntityStore, Reminder, Task};
use crate::core::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id TEXT PRIMARY KEY,
        message TEXT NOT NULL,
        due_at INTEGER NOT NULL,
        last_notified_at INTEGER,
        notify_count INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_due_at ON reminders (due_at);
    CREATE INDEX IF NOT EXISTS idx_reminders_message ON reminders (message);

    CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        description TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_description ON tasks (description);
";

const REMINDER_COLUMNS: &str = "id, message, due_at, last_notified_at, notify_count";

pub struct SqliteStore {
    connection: Arc<Mutex<ConnectionThreadSafe>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let connection = sqlite::Connection::open_thread_safe(path)?;
        connection.execute(SCHEMA)?;
        info!("Entity store ready at {path}");
        Ok(SqliteStore {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&sqlite::Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let connection = connection.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&connection)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }

    fn changes(connection: &sqlite::Connection) -> Result<u64, StoreError> {
        let mut statement = connection.prepare("SELECT changes()")?;
        match statement.next()? {
            State::Row => Ok(statement.read::<i64, _>(0usize)?.max(0) as u64),
            State::Done => Ok(0),
        }
    }

    fn read_reminders(statement: &mut Statement<'_>) -> Result<Vec<Reminder>, StoreError> {
        let mut reminders = Vec::new();
        while let State::Row = statement.next()? {
            let notify_count = statement.read::<i64, _>("notify_count")?;
            reminders.push(Reminder {
                id: parse_id("reminders", &statement.read::<String, _>("id")?)?,
                message: statement.read::<String, _>("message")?,
                due_at: from_millis("reminders", statement.read::<i64, _>("due_at")?)?,
                last_notified_at: statement
                    .read::<Option<i64>, _>("last_notified_at")?
                    .map(|ms| from_millis("reminders", ms))
                    .transpose()?,
                notify_count: u32::try_from(notify_count).map_err(|_| StoreError::Corrupt {
                    table: "reminders",
                    reason: format!("notify_count out of range: {notify_count}"),
                })?,
            });
        }
        Ok(reminders)
    }

    fn read_tasks(statement: &mut Statement<'_>) -> Result<Vec<Task>, StoreError> {
        let mut tasks = Vec::new();
        while let State::Row = statement.next()? {
            tasks.push(Task {
                id: parse_id("tasks", &statement.read::<String, _>("id")?)?,
                description: statement.read::<String, _>("description")?,
                created_at: from_millis("tasks", statement.read::<i64, _>("created_at")?)?,
            });
        }
        Ok(tasks)
    }
}

fn parse_id(table: &'static str, raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt {
        table,
        reason: format!("invalid id {raw:?}: {e}"),
    })
}

fn from_millis(table: &'static str, millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::Corrupt {
            table,
            reason: format!("timestamp out of range: {millis}"),
        })
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn create_reminder(
        &self,
        message: &str,
        due_at: DateTime<Utc>,
    ) -> Result<Reminder, StoreError> {
        let reminder = Reminder::new(message, due_at)?;
        let row = reminder.clone();
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "INSERT INTO reminders (id, message, due_at, last_notified_at, notify_count)
                 VALUES (?, ?, ?, NULL, 0)",
            )?;
            statement.bind((1, row.id.to_string().as_str()))?;
            statement.bind((2, row.message.as_str()))?;
            statement.bind((3, row.due_at.timestamp_millis()))?;
            statement.next()?;
            Ok(())
        })
        .await?;
        debug!("Stored reminder {} due {}", reminder.id, reminder.due_at);
        Ok(reminder)
    }

    async fn find_due_reminders(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders WHERE due_at <= ? ORDER BY due_at ASC"
            ))?;
            statement.bind((1, as_of.timestamp_millis()))?;
            Self::read_reminders(&mut statement)
        })
        .await
    }

    async fn save_reminder(&self, reminder: &Reminder) -> Result<bool, StoreError> {
        let id = reminder.id.to_string();
        let last_notified_at = reminder.last_notified_at.map(|t| t.timestamp_millis());
        let notify_count = i64::from(reminder.notify_count);
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "UPDATE reminders SET last_notified_at = ?, notify_count = ? WHERE id = ?",
            )?;
            statement.bind((1, last_notified_at))?;
            statement.bind((2, notify_count))?;
            statement.bind((3, id.as_str()))?;
            statement.next()?;
            drop(statement);
            Ok(Self::changes(conn)? > 0)
        })
        .await
    }

    async fn delete_reminder_by_message(&self, message: &str) -> Result<bool, StoreError> {
        let message = message.to_string();
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "DELETE FROM reminders WHERE id = (
                    SELECT id FROM reminders WHERE message = ? ORDER BY due_at ASC LIMIT 1
                 )",
            )?;
            statement.bind((1, message.as_str()))?;
            statement.next()?;
            drop(statement);
            Ok(Self::changes(conn)? > 0)
        })
        .await
    }

    async fn delete_reminder(&self, id: Uuid) -> Result<bool, StoreError> {
        self.with_connection(move |conn| {
            let mut statement = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
            statement.bind((1, id.to_string().as_str()))?;
            statement.next()?;
            drop(statement);
            Ok(Self::changes(conn)? > 0)
        })
        .await
    }

    async fn list_reminders(&self) -> Result<Vec<Reminder>, StoreError> {
        self.with_connection(|conn| {
            let mut statement = conn.prepare(format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders ORDER BY due_at ASC"
            ))?;
            Self::read_reminders(&mut statement)
        })
        .await
    }

    async fn create_task(&self, description: &str) -> Result<Task, StoreError> {
        let task = Task::new(description, Utc::now())?;
        let row = task.clone();
        self.with_connection(move |conn| {
            let mut statement =
                conn.prepare("INSERT INTO tasks (id, description, created_at) VALUES (?, ?, ?)")?;
            statement.bind((1, row.id.to_string().as_str()))?;
            statement.bind((2, row.description.as_str()))?;
            statement.bind((3, row.created_at.timestamp_millis()))?;
            statement.next()?;
            Ok(())
        })
        .await?;
        Ok(task)
    }

    async fn delete_task_by_description(&self, description: &str) -> Result<bool, StoreError> {
        let description = description.to_string();
        self.with_connection(move |conn| {
            let mut statement = conn.prepare(
                "DELETE FROM tasks WHERE id = (
                    SELECT id FROM tasks WHERE description = ? ORDER BY created_at ASC LIMIT 1
                 )",
            )?;
            statement.bind((1, description.as_str()))?;
            statement.next()?;
            drop(statement);
            Ok(Self::changes(conn)? > 0)
        })
        .await
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        self.with_connection(move |conn| {
            let mut statement = conn.prepare("DELETE FROM tasks WHERE id = ?")?;
            statement.bind((1, id.to_string().as_str()))?;
            statement.next()?;
            drop(statement);
            Ok(Self::changes(conn)? > 0)
        })
        .await
    }

    async fn delete_all_tasks(&self) -> Result<u64, StoreError> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM tasks")?;
            Self::changes(conn)
        })
        .await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.with_connection(|conn| {
            let mut statement = conn.prepare(
                "SELECT id, description, created_at FROM tasks ORDER BY created_at ASC, rowid ASC",
            )?;
            Self::read_tasks(&mut statement)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SqliteStore {
        SqliteStore::open(":memory:").unwrap()
    }

    #[tokio::test]
    async fn test_reminder_roundtrip_through_save() {
        let store = store();
        let due = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut reminder = store.create_reminder("Reminder to stretch", due).await.unwrap();

        reminder.notify_count = 1;
        reminder.last_notified_at = Some(due + Duration::minutes(1));
        assert!(store.save_reminder(&reminder).await.unwrap());

        let listed = store.list_reminders().await.unwrap();
        assert_eq!(listed, vec![reminder]);
    }

    #[tokio::test]
    async fn test_save_reports_deleted_reminder() {
        let store = store();
        let mut reminder = store.create_reminder("Reminder to leave", Utc::now()).await.unwrap();
        assert!(store.delete_reminder(reminder.id).await.unwrap());

        reminder.notify_count = 1;
        assert!(!store.save_reminder(&reminder).await.unwrap());
        assert!(store.list_reminders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_due_reminders_ordering() {
        let store = store();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        store.create_reminder("late", now + Duration::seconds(1)).await.unwrap();
        store.create_reminder("b", now).await.unwrap();
        store.create_reminder("a", now - Duration::hours(2)).await.unwrap();

        let due = store.find_due_reminders(now).await.unwrap();
        let messages: Vec<&str> = due.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_reminder_by_message_is_single() {
        let store = store();
        let now = Utc::now();
        store.create_reminder("water plants", now).await.unwrap();
        store.create_reminder("water plants", now).await.unwrap();

        assert!(store.delete_reminder_by_message("water plants").await.unwrap());
        assert_eq!(store.list_reminders().await.unwrap().len(), 1);
        assert!(!store.delete_reminder_by_message("feed cat").await.unwrap());
    }

    #[tokio::test]
    async fn test_tasks() {
        let store = store();
        let milk = store.create_task("buy milk").await.unwrap();
        store.create_task("walk dog").await.unwrap();
        store.create_task("call bank").await.unwrap();

        assert!(store.delete_task_by_description("walk dog").await.unwrap());
        assert!(!store.delete_task_by_description("walk dog").await.unwrap());
        assert!(store.delete_task(milk.id).await.unwrap());
        assert!(!store.delete_task(Uuid::new_v4()).await.unwrap());

        let remaining = store.list_tasks().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].description, "call bank");

        assert_eq!(store.delete_all_tasks().await.unwrap(), 1);
        assert!(store.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reminder_by_id() {
        let store = store();
        let reminder = store.create_reminder("drink water", Utc::now()).await.unwrap();

        assert!(store.delete_reminder(reminder.id).await.unwrap());
        assert!(store.list_reminders().await.unwrap().is_empty());
    }
}
