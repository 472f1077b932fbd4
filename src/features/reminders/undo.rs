//! Volatile stack of recently notified reminders
//!
//! Pushed by the scheduler after each successful notification, popped by the
//! "undo last reminder" command. Lives for the process lifetime only.

use log::debug;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub reminder_id: Uuid,
    pub message: String,
}

pub struct UndoStack {
    entries: Mutex<VecDeque<UndoEntry>>,
    limit: usize,
}

impl UndoStack {
    /// `limit` caps retained entries; the oldest entry is dropped when it is exceeded
    pub fn new(limit: usize) -> Self {
        UndoStack {
            entries: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
        }
    }

    /// Push unless the current top carries the same message; returns whether it was pushed
    pub async fn push_if_not_duplicate(&self, entry: UndoEntry) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.back().is_some_and(|top| top.message == entry.message) {
            debug!("Undo stack top already holds {:?}", entry.message);
            return false;
        }
        entries.push_back(entry);
        if entries.len() > self.limit {
            entries.pop_front();
        }
        true
    }

    pub async fn pop_top(&self) -> Option<UndoEntry> {
        self.entries.lock().await.pop_back()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Messages from bottom to top
    pub async fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(100)
    }
}
