//! Intent results and the actions they map to
//!
//! An `IntentResult` is what the NLU engine returned for one utterance. `plan_actions` turns it
//! into the ordered list of `IntentKind`s the dispatcher runs.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ParseError;

/// Interpreted utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResult {
    /// Fulfillment text produced by the NLU agent
    pub response_text: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub query_text: String,
    /// Structured intent identifier, when the agent supplies one
    #[serde(default)]
    pub intent: Option<String>,
}

/// One dispatchable action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    AddTask,
    CreateReminder,
    UndoLastReminder,
    DeleteAllTasks,
    DeleteTask,
}

impl IntentKind {
    /// Map a structured intent name such as `task.add` or `Reminder - Undo Last`
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        match normalized.as_str() {
            "taskadd" | "addtask" => Some(IntentKind::AddTask),
            "taskdelete" | "deletetask" => Some(IntentKind::DeleteTask),
            "taskdeleteall" | "deletealltasks" => Some(IntentKind::DeleteAllTasks),
            "remindercreate" | "createreminder" => Some(IntentKind::CreateReminder),
            "reminderundolast" | "undolastreminder" => Some(IntentKind::UndoLastReminder),
            _ => None,
        }
    }
}

/// Ordered actions for one intent result
///
/// A recognised structured intent replaces the response-text triggers. The reminder rule is
/// driven by parameters and is always evaluated.
pub fn plan_actions(result: &IntentResult) -> Vec<IntentKind> {
    let lowered = result.response_text.to_lowercase();
    let structured = result.intent.as_deref().and_then(IntentKind::from_name);

    let fires = |kind: IntentKind, text_trigger: bool| match structured {
        Some(selected) => selected == kind,
        None => text_trigger,
    };

    let deleted = lowered.starts_with("deleted");
    let everything = lowered.contains("deleted everything");

    let mut actions = Vec::new();
    if fires(IntentKind::AddTask, lowered.starts_with("added")) {
        actions.push(IntentKind::AddTask);
    }
    actions.push(IntentKind::CreateReminder);
    if fires(IntentKind::UndoLastReminder, lowered.contains("last reminder")) {
        actions.push(IntentKind::UndoLastReminder);
    }
    if fires(IntentKind::DeleteAllTasks, deleted && everything) {
        actions.push(IntentKind::DeleteAllTasks);
    }
    if fires(IntentKind::DeleteTask, deleted && !everything) {
        actions.push(IntentKind::DeleteTask);
    }
    actions
}

impl IntentResult {
    /// Shorthand for a text-only result
    pub fn from_response(response_text: impl Into<String>) -> Self {
        IntentResult {
            response_text: response_text.into(),
            ..Default::default()
        }
    }

    fn string_param(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Raw date-time string of the `date-time` parameter, if it resolves to one
    pub fn date_time_param(&self) -> Option<String> {
        self.parameters.get("date-time").and_then(resolve_date_time)
    }

    /// `Reminder to <do> <Event>`, skipping whichever part is missing
    pub fn reminder_message(&self) -> Result<String, ParseError> {
        let parts: Vec<&str> = ["do", "Event"]
            .iter()
            .filter_map(|key| self.string_param(key))
            .collect();

        if parts.is_empty() {
            return Err(ParseError::MissingParameter("do"));
        }
        Ok(format!("Reminder to {}", parts.join(" ")))
    }
}

fn resolve_date_time(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(fields) => ["date_time", "dateTime", "startDateTime"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(resolve_date_time)),
        Value::Array(items) => items.iter().find_map(resolve_date_time),
        _ => None,
    }
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS` read as UTC
pub fn parse_date_time(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ParseError::InvalidDateTime {
            value: raw.to_string(),
            reason: "expected RFC 3339 or YYYY-MM-DDTHH:MM:SS".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn with_params(text: &str, params: Value) -> IntentResult {
        IntentResult {
            response_text: text.to_string(),
            parameters: params.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_rules() {
        use IntentKind::*;

        let plan = |text: &str| plan_actions(&IntentResult::from_response(text));

        assert_eq!(plan("Added 'buy milk' to the list"), vec![AddTask, CreateReminder]);
        assert_eq!(plan("ADDED 'x'"), vec![AddTask, CreateReminder]);
        assert_eq!(plan("Deleted everything"), vec![CreateReminder, DeleteAllTasks]);
        assert_eq!(plan("Deleted 'buy milk'"), vec![CreateReminder, DeleteTask]);
        assert_eq!(
            plan("Okay, I will remove the last reminder"),
            vec![CreateReminder, UndoLastReminder]
        );
        assert_eq!(plan("Hello there"), vec![CreateReminder]);
    }

    #[test]
    fn test_rules_are_not_exclusive() {
        use IntentKind::*;
        let plan = plan_actions(&IntentResult::from_response(
            "Deleted the last reminder and deleted everything",
        ));
        assert_eq!(plan, vec![CreateReminder, UndoLastReminder, DeleteAllTasks]);
    }

    #[test]
    fn test_structured_intent_overrides_text() {
        let mut result = IntentResult::from_response("Sure thing, 'buy milk' is gone");
        result.intent = Some("task.delete".to_string());
        assert_eq!(
            plan_actions(&result),
            vec![IntentKind::CreateReminder, IntentKind::DeleteTask]
        );

        // Unknown names fall back to text triggers
        result.intent = Some("smalltalk.greetings".to_string());
        assert_eq!(plan_actions(&result), vec![IntentKind::CreateReminder]);
    }

    #[test]
    fn test_intent_name_normalization() {
        assert_eq!(IntentKind::from_name("Task - Add"), Some(IntentKind::AddTask));
        assert_eq!(
            IntentKind::from_name("reminder.undo_last"),
            Some(IntentKind::UndoLastReminder)
        );
        assert_eq!(
            IntentKind::from_name("task_delete_all"),
            Some(IntentKind::DeleteAllTasks)
        );
        assert_eq!(IntentKind::from_name("Default Welcome Intent"), None);
    }

    #[test]
    fn test_date_time_shapes() {
        let raw = "2024-06-14T18:00:00+05:30";
        for params in [
            json!({"date-time": raw}),
            json!({"date-time": {"date_time": raw}}),
            json!({"date-time": {"dateTime": raw}}),
            json!({"date-time": {"startDateTime": raw, "endDateTime": "2024-06-14T19:00:00+05:30"}}),
            json!({"date-time": [{"date_time": raw}]}),
        ] {
            assert_eq!(
                with_params("ok", params).date_time_param().as_deref(),
                Some(raw)
            );
        }

        assert!(with_params("ok", json!({})).date_time_param().is_none());
        assert!(with_params("ok", json!({"date-time": ""})).date_time_param().is_none());
        assert!(with_params("ok", json!({"date-time": {}})).date_time_param().is_none());
    }

    #[test]
    fn test_reminder_message() {
        let result = with_params("ok", json!({"do": "call", "Event": "mom"}));
        assert_eq!(result.reminder_message().unwrap(), "Reminder to call mom");

        let result = with_params("ok", json!({"do": "stretch", "Event": ""}));
        assert_eq!(result.reminder_message().unwrap(), "Reminder to stretch");

        let result = with_params("ok", json!({}));
        assert_eq!(
            result.reminder_message(),
            Err(ParseError::MissingParameter("do"))
        );
    }

    #[test]
    fn test_parse_date_time() {
        assert_eq!(
            parse_date_time("2024-06-14T18:00:00+05:30").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 14, 12, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date_time("2024-06-14T18:00:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 14, 18, 0, 0).unwrap()
        );
        assert!(matches!(
            parse_date_time("next tuesday"),
            Err(ParseError::InvalidDateTime { .. })
        ));
        assert!(parse_date_time("2024-13-45T99:00:00").is_err());
    }
}
