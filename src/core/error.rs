//! Error taxonomy shared by the store, the dispatcher and the notification hub.
//!
//! None of these are fatal. Callers log them and skip the current item, rule or receiver.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use thiserror::Error;

/// Persistence failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlite::Error),

    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("invalid {entity}: {reason}")]
    InvalidEntity { entity: &'static str, reason: String },

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Malformed or incomplete intent result
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no quoted task name in response: {response:?}")]
    MissingQuotedText { response: String },

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid date-time {value:?}: {reason}")]
    InvalidDateTime { value: String, reason: String },
}

/// A single receiver could not take a message
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("receiver {0} is full, event dropped")]
    ReceiverFull(u64),

    #[error("receiver {0} is closed")]
    ReceiverClosed(u64),

    #[error("receiver limit reached ({0})")]
    TooManyReceivers(usize),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}
