//! # Request Boundary
//!
//! JSON over HTTP for the browser client: utterances in, replies and entity listings out.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorBody};
pub use routes::{cors, router, serve, AppState, DialogflowReply};
