//! HTTP routes
//!
//! - `POST /dialogflow`: detect, dispatch, reply with `{"response": ...}`
//! - `GET /todos`, `DELETE /todos/:id`
//! - `GET /reminders`, `DELETE /reminders/:id`
//! - `GET /`: liveness

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::database::{EntityStore, Reminder, Task};
use crate::features::intents::{DetectRequest, IntentDetector, IntentDispatcher};
use crate::http::error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub dispatcher: Arc<IntentDispatcher>,
    pub detector: Arc<dyn IntentDetector>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DialogflowReply {
    pub response: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/dialogflow", post(detect_and_dispatch))
        .route("/todos", get(list_tasks))
        .route("/todos/:id", delete(delete_task))
        .route("/reminders", get(list_reminders))
        .route("/reminders/:id", delete(delete_reminder))
        .with_state(state)
}

/// CORS for the browser client at `origin`
pub fn cors(origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("invalid CORS origin {origin:?}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true))
}

/// Bind the request listener and serve until the process exits
pub async fn serve(state: AppState, port: u16, origin: &str) -> Result<()> {
    let app = router(state).layer(cors(origin)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn liveness() -> &'static str {
    "Taskmate is running"
}

async fn detect_and_dispatch(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<DialogflowReply>, ApiError> {
    if request.query_text.trim().is_empty() {
        return Err(ApiError::InvalidInput {
            field: "queryText",
            reason: "must not be empty".to_string(),
        });
    }

    let result = state.detector.detect(&request).await.map_err(ApiError::Nlu)?;
    debug!("Detected intent {:?} for {:?}", result.intent, request.query_text);

    let response = state.dispatcher.dispatch(&result).await;
    Ok(Json(DialogflowReply { response }))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.list_tasks().await?))
}

async fn list_reminders(State(state): State<AppState>) -> Result<Json<Vec<Reminder>>, ApiError> {
    Ok(Json(state.store.list_reminders().await?))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if state.store.delete_task(id).await? {
        Ok((StatusCode::OK, "Task deleted successfully"))
    } else {
        Ok((StatusCode::NOT_FOUND, "Task not found"))
    }
}

async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if state.store.delete_reminder(id).await? {
        Ok((StatusCode::OK, "Reminder deleted successfully"))
    } else {
        Ok((StatusCode::NOT_FOUND, "Reminder not found"))
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::InvalidInput {
        field: "id",
        reason: e.to_string(),
    })
}
