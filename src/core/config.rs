//! Environment-driven configuration
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! All settings are plain key/value environment variables (a `.env` file is loaded by the
//! binary before `Config::from_env` runs). Only the NLU credentials are required.

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use std::str::FromStr;

/// Upper bound for any configured interval or offset, in seconds (ten years)
const MAX_DURATION_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Retry/dedup gate applied by the reminder scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotificationPolicy {
    /// How often the scheduler scans for due reminders
    pub tick_interval: std::time::Duration,
    /// Cap on notifications sent for one reminder
    pub max_notifications: u32,
    /// Minimum spacing between two notifications of one reminder
    pub renotify_interval: Duration,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        NotificationPolicy {
            tick_interval: std::time::Duration::from_secs(60),
            max_notifications: 2,
            renotify_interval: Duration::minutes(5),
        }
    }
}

/// Fixed clock corrections between wall-clock time and the store's timestamps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetPolicy {
    /// Added to "now" before querying due reminders
    pub scheduler_clock: Duration,
    /// Added to a parsed reminder due time before it is stored
    pub reminder_due: Duration,
}

impl Default for OffsetPolicy {
    fn default() -> Self {
        OffsetPolicy {
            scheduler_clock: Duration::minutes(330),
            reminder_due: Duration::hours(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub http_port: u16,
    pub channel_port: u16,
    pub cors_origin: String,
    pub log_level: String,
    pub dialogflow_project_id: String,
    pub dialogflow_access_token: String,
    pub dialogflow_endpoint: String,
    pub notification: NotificationPolicy,
    pub offsets: OffsetPolicy,
    pub undo_stack_limit: usize,
    pub channel_buffer: usize,
    pub heartbeat_interval: std::time::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = NotificationPolicy::default();
        let offsets = OffsetPolicy::default();

        let max_notifications = parse_or(&lookup, "MAX_NOTIFICATIONS", defaults.max_notifications)?;
        if max_notifications == 0 {
            return Err(anyhow!("MAX_NOTIFICATIONS must be at least 1"));
        }

        let tick_secs: u64 = parse_or(&lookup, "SCHEDULER_INTERVAL_SECS", 60)?;
        if tick_secs == 0 {
            return Err(anyhow!("SCHEDULER_INTERVAL_SECS must be at least 1"));
        }

        Ok(Config {
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "taskmate.db".to_string()),
            http_port: parse_or(&lookup, "HTTP_PORT", 5000)?,
            channel_port: parse_or(&lookup, "CHANNEL_PORT", 8080)?,
            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            dialogflow_project_id: lookup("DIALOGFLOW_PROJECT_ID")
                .ok_or_else(|| anyhow!("DIALOGFLOW_PROJECT_ID must be set"))?,
            dialogflow_access_token: lookup("DIALOGFLOW_ACCESS_TOKEN")
                .ok_or_else(|| anyhow!("DIALOGFLOW_ACCESS_TOKEN must be set"))?,
            dialogflow_endpoint: lookup("DIALOGFLOW_ENDPOINT")
                .unwrap_or_else(|| "https://dialogflow.googleapis.com/v2".to_string()),
            notification: NotificationPolicy {
                tick_interval: std::time::Duration::from_secs(tick_secs),
                max_notifications,
                renotify_interval: seconds_or(
                    &lookup,
                    "RENOTIFY_INTERVAL_SECS",
                    defaults.renotify_interval,
                    0,
                )?,
            },
            offsets: OffsetPolicy {
                scheduler_clock: seconds_or(
                    &lookup,
                    "SCHEDULER_CLOCK_OFFSET_SECS",
                    offsets.scheduler_clock,
                    -MAX_DURATION_SECS,
                )?,
                reminder_due: seconds_or(
                    &lookup,
                    "REMINDER_DUE_OFFSET_SECS",
                    offsets.reminder_due,
                    -MAX_DURATION_SECS,
                )?,
            },
            undo_stack_limit: parse_or(&lookup, "UNDO_STACK_LIMIT", 100)?,
            channel_buffer: parse_or(&lookup, "CHANNEL_BUFFER", 32)?.max(1),
            heartbeat_interval: std::time::Duration::from_secs(
                parse_or(&lookup, "HEARTBEAT_SECS", 30u64)?.max(1),
            ),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

/// Whole seconds in `min..=MAX_DURATION_SECS`
fn seconds_or<F>(lookup: &F, key: &str, default: Duration, min: i64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: i64 = parse_or(lookup, key, default.num_seconds())?;
    if !(min..=MAX_DURATION_SECS).contains(&secs) {
        return Err(anyhow!(
            "{key} must be between {min} and {MAX_DURATION_SECS} seconds, got {secs}"
        ));
    }
    Ok(Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("DIALOGFLOW_PROJECT_ID", "assistant-1"),
        ("DIALOGFLOW_ACCESS_TOKEN", "token"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&CREDENTIALS)).unwrap();

        assert_eq!(config.http_port, 5000);
        assert_eq!(config.channel_port, 8080);
        assert_eq!(config.database_path, "taskmate.db");
        assert_eq!(config.notification, NotificationPolicy::default());
        assert_eq!(config.offsets.scheduler_clock, Duration::minutes(330));
        assert_eq!(config.offsets.reminder_due, Duration::hours(5));
        assert_eq!(config.undo_stack_limit, 100);
    }

    #[test]
    fn test_overrides() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("MAX_NOTIFICATIONS", "3"));
        pairs.push(("RENOTIFY_INTERVAL_SECS", "60"));
        pairs.push(("SCHEDULER_CLOCK_OFFSET_SECS", "0"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.notification.max_notifications, 3);
        assert_eq!(config.notification.renotify_interval, Duration::seconds(60));
        assert_eq!(config.offsets.scheduler_clock, Duration::zero());
    }

    #[test]
    fn test_missing_credentials() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("HTTP_PORT", "not-a-port"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("MAX_NOTIFICATIONS", "0"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        for (key, value) in [
            ("RENOTIFY_INTERVAL_SECS", "-1"),
            ("RENOTIFY_INTERVAL_SECS", "9223372036854775807"),
            ("SCHEDULER_CLOCK_OFFSET_SECS", "9223372036854775807"),
            ("REMINDER_DUE_OFFSET_SECS", "-9223372036854775808"),
        ] {
            let mut pairs = CREDENTIALS.to_vec();
            pairs.push((key, value));
            assert!(
                Config::from_lookup(lookup_from(&pairs)).is_err(),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_negative_offsets_allowed() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("SCHEDULER_CLOCK_OFFSET_SECS", "-3600"));
        pairs.push(("RENOTIFY_INTERVAL_SECS", "0"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.offsets.scheduler_clock, Duration::hours(-1));
        assert_eq!(config.notification.renotify_interval, Duration::zero());
    }
}
