//! Response text helpers for the to-do flow
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Quoted task extraction and deletion confirmations

use regex::Regex;
use std::sync::OnceLock;

static QUOTED: OnceLock<Regex> = OnceLock::new();

fn quoted_pattern() -> &'static Regex {
    QUOTED.get_or_init(|| Regex::new(r"'([^']+)'").expect("static pattern is valid"))
}

/// Return the first single-quoted substring of `text`, without the quotes
///
/// Empty quotes (`''`) never match, so a returned value is always non-empty.
pub fn extract_quoted(text: &str) -> Option<&str> {
    quoted_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Confirmation sent after a task was removed
pub fn task_deleted(description: &str) -> String {
    format!("Deleted '{description}' from the to-do list.")
}

/// Reply sent when no task matched the description
pub fn task_not_found(description: &str) -> String {
    format!("Could not find '{description}' in the to-do list.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_quoted() {
        assert_eq!(
            extract_quoted("Added 'buy milk' to the list"),
            Some("buy milk")
        );
        assert_eq!(extract_quoted("'a' and 'b'"), Some("a"));
    }

    #[test]
    fn test_extract_missing_or_empty() {
        assert_eq!(extract_quoted("Added to the list"), None);
        assert_eq!(extract_quoted("Added '' to the list"), None);
        assert_eq!(extract_quoted("it's open"), None);
    }

    #[test]
    fn test_confirmation_phrasing() {
        assert_eq!(task_deleted("buy milk"), "Deleted 'buy milk' from the to-do list.");
        assert_eq!(
            task_not_found("buy milk"),
            "Could not find 'buy milk' in the to-do list."
        );
    }
}
