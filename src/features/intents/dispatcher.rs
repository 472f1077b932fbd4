//! Intent dispatcher
//!
//! Runs every action planned for an intent result against the store and the undo stack,
//! and returns the reply for the client. Each action fails on its own: errors are logged and
//! the remaining actions still run.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::core::{extract_quoted, task_deleted, task_not_found, OffsetPolicy};
use crate::core::{ParseError, StoreError};
use crate::database::EntityStore;
use crate::features::intents::result::{parse_date_time, plan_actions, IntentKind, IntentResult};
use crate::features::reminders::UndoStack;

#[derive(Debug, Error)]
enum RuleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub struct IntentDispatcher {
    store: Arc<dyn EntityStore>,
    undo: Arc<UndoStack>,
    offsets: OffsetPolicy,
}

impl IntentDispatcher {
    pub fn new(store: Arc<dyn EntityStore>, undo: Arc<UndoStack>, offsets: OffsetPolicy) -> Self {
        IntentDispatcher {
            store,
            undo,
            offsets,
        }
    }

    /// Apply an intent result and return the final response text
    ///
    /// Every rule sees the original response text. Only task deletion rewrites the reply.
    pub async fn dispatch(&self, result: &IntentResult) -> String {
        let mut response = result.response_text.clone();

        for action in plan_actions(result) {
            debug!("Dispatching {:?}", action);
            let outcome = match action {
                IntentKind::AddTask => self.add_task(result).await,
                IntentKind::CreateReminder => self.create_reminder(result).await,
                IntentKind::UndoLastReminder => self.undo_last_reminder().await,
                IntentKind::DeleteAllTasks => self.delete_all_tasks().await,
                IntentKind::DeleteTask => match self.delete_task(result).await {
                    Ok(reply) => {
                        response = reply;
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            };

            if let Err(e) = outcome {
                match e {
                    RuleError::Parse(e) => error!("{:?} rule skipped: {e}", action),
                    RuleError::Store(e) => error!("{:?} rule failed: {e}", action),
                }
            }
        }

        response
    }

    async fn add_task(&self, result: &IntentResult) -> Result<(), RuleError> {
        let description = quoted_task(result)?;
        let task = self.store.create_task(description).await?;
        info!("Todo task saved: {} ({})", task.description, task.id);
        Ok(())
    }

    async fn create_reminder(&self, result: &IntentResult) -> Result<(), RuleError> {
        let Some(raw) = result.date_time_param() else {
            debug!("No date-time parameter, no reminder to create");
            return Ok(());
        };

        let message = result.reminder_message()?;
        let due_at = parse_date_time(&raw)?
            .checked_add_signed(self.offsets.reminder_due)
            .ok_or_else(|| ParseError::InvalidDateTime {
                value: raw.clone(),
                reason: "out of range after offset".to_string(),
            })?;

        let reminder = self.store.create_reminder(&message, due_at).await?;
        info!("Reminder saved: {} at {}", reminder.message, reminder.due_at);
        Ok(())
    }

    async fn undo_last_reminder(&self) -> Result<(), RuleError> {
        let Some(entry) = self.undo.pop_top().await else {
            info!("No last reminder found in stack");
            return Ok(());
        };

        if self.store.delete_reminder_by_message(&entry.message).await? {
            info!("Reminder removed from database: {}", entry.message);
        } else {
            warn!("Reminder not found in database: {}", entry.message);
        }
        Ok(())
    }

    async fn delete_all_tasks(&self) -> Result<(), RuleError> {
        let removed = self.store.delete_all_tasks().await?;
        info!("Deleted all {removed} todo task(s)");
        Ok(())
    }

    async fn delete_task(&self, result: &IntentResult) -> Result<String, RuleError> {
        let description = quoted_task(result)?;
        if self.store.delete_task_by_description(description).await? {
            info!("Todo task deleted: {description}");
            Ok(task_deleted(description))
        } else {
            info!("Todo task not found: {description}");
            Ok(task_not_found(description))
        }
    }
}

fn quoted_task(result: &IntentResult) -> Result<&str, ParseError> {
    extract_quoted(&result.response_text).ok_or_else(|| ParseError::MissingQuotedText {
        response: result.response_text.clone(),
    })
}
