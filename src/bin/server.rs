use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use taskmate::core::Config;
use taskmate::database::{EntityStore, SqliteStore};
use taskmate::features::intents::{DialogflowClient, IntentDetector, IntentDispatcher};
use taskmate::features::reminders::{ReminderScheduler, UndoStack};
use taskmate::http::{self, AppState};
use taskmate::ipc::{NotificationChannel, NotificationHub};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Taskmate...");

    let store: Arc<dyn EntityStore> = Arc::new(SqliteStore::open(&config.database_path)?);
    info!("Entity store opened at {}", config.database_path);

    // Notification channel for connected clients
    let hub = Arc::new(NotificationHub::new(config.channel_buffer));
    if let Err(e) = hub.clone().start(config.channel_port).await {
        error!("Failed to start notification channel: {e}. Clients will not receive reminders.");
    } else {
        hub.clone().start_heartbeat(config.heartbeat_interval);
    }

    let undo = Arc::new(UndoStack::new(config.undo_stack_limit));
    let channel: Arc<dyn NotificationChannel> = hub.clone();

    let scheduler = Arc::new(ReminderScheduler::new(
        store.clone(),
        channel,
        undo.clone(),
        config.notification,
        config.offsets.scheduler_clock,
    ));
    tokio::spawn(scheduler.run());

    let detector: Arc<dyn IntentDetector> = Arc::new(DialogflowClient::from_config(&config)?);
    let dispatcher = Arc::new(IntentDispatcher::new(store.clone(), undo, config.offsets));

    let state = AppState {
        store,
        dispatcher,
        detector,
    };

    http::serve(state, config.http_port, &config.cors_origin).await
}
