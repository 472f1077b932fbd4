//! Reminder scheduler
//!
//! Scans the store on a fixed cadence, runs each due reminder through the notification gate,
//! broadcasts admitted reminders and records them on the undo stack.
//!
//! - **Version**: 2.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.1.0: Gate honours broadcasts whose save failed; vanished reminders skip the undo stack
//! - 2.0.0: Retry cap and re-notify spacing, serialized ticks, per-reminder failure isolation
//! - 1.0.0: Initial polling loop

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::core::NotificationPolicy;
use crate::database::{EntityStore, Reminder};
use crate::features::reminders::undo::{UndoEntry, UndoStack};
use crate::ipc::{NotificationChannel, ReminderNotice};

impl NotificationPolicy {
    /// The notification gate: under the cap and outside the re-notify window
    pub fn admits(&self, reminder: &Reminder, now: DateTime<Utc>) -> bool {
        reminder.notify_count < self.max_notifications
            && reminder
                .last_notified_at
                .map_or(true, |last| now - last >= self.renotify_interval)
    }
}

/// Counters for one completed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub notified: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Notified,
    Skipped,
    Failed,
}

pub struct ReminderScheduler {
    store: Arc<dyn EntityStore>,
    channel: Arc<dyn NotificationChannel>,
    undo: Arc<UndoStack>,
    policy: NotificationPolicy,
    clock_offset: Duration,
    in_flight: Mutex<()>,
    /// Last broadcast time and count for reminders whose bookkeeping did not reach the store
    unsaved: DashMap<Uuid, (DateTime<Utc>, u32)>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        channel: Arc<dyn NotificationChannel>,
        undo: Arc<UndoStack>,
        policy: NotificationPolicy,
        clock_offset: Duration,
    ) -> Self {
        ReminderScheduler {
            store,
            channel,
            undo,
            policy,
            clock_offset,
            in_flight: Mutex::new(()),
            unsaved: DashMap::new(),
        }
    }

    /// Tick forever at the policy cadence
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.policy.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Reminder scheduler started (interval: {:?}, clock offset: {}s)",
            self.policy.tick_interval,
            self.clock_offset.num_seconds()
        );

        loop {
            interval.tick().await;
            if let Some(report) = self.tick().await {
                if report.notified > 0 || report.failed > 0 {
                    info!(
                        "Reminder tick: {} due, {} notified, {} skipped, {} failed",
                        report.due, report.notified, report.skipped, report.failed
                    );
                }
            }
        }
    }

    pub async fn tick(&self) -> Option<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Run one tick as if the wall clock read `now`
    ///
    /// Returns `None` when another tick is still in flight; the two never overlap.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Option<TickReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Previous reminder tick still running, skipping");
            return None;
        };

        let Some(as_of) = now.checked_add_signed(self.clock_offset) else {
            error!("Clock offset {}s overflows {}", self.clock_offset.num_seconds(), now);
            return Some(TickReport::default());
        };
        debug!("Checking for reminders due by {}", as_of.to_rfc3339());

        let due = match self.store.find_due_reminders(as_of).await {
            Ok(due) => due,
            Err(e) => {
                error!("Failed to query due reminders: {e}");
                return Some(TickReport::default());
            }
        };

        self.unsaved.retain(|id, _| due.iter().any(|r| r.id == *id));

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for reminder in due {
            match self.process(reminder, now).await {
                Outcome::Notified => report.notified += 1,
                Outcome::Skipped => report.skipped += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        Some(report)
    }

    async fn process(&self, mut reminder: Reminder, now: DateTime<Utc>) -> Outcome {
        let unsaved = self.unsaved.get(&reminder.id).map(|entry| *entry.value());
        if let Some((last, count)) = unsaved {
            reminder.notify_count = reminder.notify_count.max(count);
            reminder.last_notified_at = reminder.last_notified_at.max(Some(last));
        }

        if !self.policy.admits(&reminder, now) {
            return Outcome::Skipped;
        }

        info!("Sending reminder: {} at {}", reminder.message, reminder.due_at);
        self.channel.broadcast(&ReminderNotice {
            message: reminder.message.clone(),
            due_at: reminder.due_at,
        });

        reminder.last_notified_at = Some(now);
        reminder.notify_count += 1;

        match self.store.save_reminder(&reminder).await {
            Ok(true) => {
                self.unsaved.remove(&reminder.id);
            }
            Ok(false) => {
                self.unsaved.remove(&reminder.id);
                warn!("Reminder {} was deleted while being notified", reminder.id);
                return Outcome::Failed;
            }
            Err(e) => {
                error!("Failed to save reminder {}: {e}", reminder.id);
                self.unsaved.insert(reminder.id, (now, reminder.notify_count));
                return Outcome::Failed;
            }
        }

        self.undo
            .push_if_not_duplicate(UndoEntry {
                reminder_id: reminder.id,
                message: reminder.message,
            })
            .await;
        Outcome::Notified
    }
}
