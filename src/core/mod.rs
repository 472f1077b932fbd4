//! # Core Module
//!
//! Core domain types, configuration, and error handling for the assistant.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add error taxonomy for store, parse and channel failures
//! - 1.1.0: Add response module with to-do confirmation phrasing
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod error;
pub mod response;

// Re-export commonly used items
pub use config::{Config, NotificationPolicy, OffsetPolicy};
pub use error::{ChannelError, ParseError, StoreError};
pub use response::{extract_quoted, task_deleted, task_not_found};
