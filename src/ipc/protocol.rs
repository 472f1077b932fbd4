//! # Channel Protocol
//!
//! Events pushed from the assistant to connected UI clients.
//!
//! Each event is one JSON text frame, tagged by `type`:
//! - `{"type":"Reminder","message":"...","time":"2024-06-14T18:00:00Z"}`
//! - `{"type":"Heartbeat","timestamp":1718388000}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload of one reminder notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderNotice {
    pub message: String,
    pub due_at: DateTime<Utc>,
}

/// Events sent to every connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelEvent {
    /// A reminder passed the notification gate
    Reminder {
        message: String,
        time: DateTime<Utc>,
    },
    /// Keeps idle connections alive
    Heartbeat { timestamp: i64 },
}

impl From<&ReminderNotice> for ChannelEvent {
    fn from(notice: &ReminderNotice) -> Self {
        ChannelEvent::Reminder {
            message: notice.message.clone(),
            time: notice.due_at,
        }
    }
}

/// Encode an event as a text frame
pub fn encode_event(event: &ChannelEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}
