//! # IPC Module
//!
//! Real-time delivery of reminder notifications to connected UI clients.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: WebSocket transport and `NotificationChannel` seam for the scheduler
//! - 1.0.0: Initial IPC implementation

pub mod protocol;
pub mod server;

pub use protocol::{ChannelEvent, ReminderNotice};
pub use server::NotificationHub;

/// Broadcast seam used by the reminder scheduler
///
/// Implementations deliver to every receiver that is currently open and silently skip the
/// rest. They must return without waiting on any receiver.
pub trait NotificationChannel: Send + Sync {
    fn broadcast(&self, notice: &ReminderNotice);
}
