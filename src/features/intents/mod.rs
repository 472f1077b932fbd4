//! # Intents Feature
//!
//! Turns interpreted utterances into to-do and reminder mutations.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod dispatcher;
pub mod nlu;
pub mod result;

pub use dispatcher::IntentDispatcher;
pub use nlu::{DetectRequest, DialogflowClient, IntentDetector};
pub use result::{plan_actions, IntentKind, IntentResult};
