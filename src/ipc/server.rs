//! # Notification Hub
//!
//! Registry of live client connections and the WebSocket listener that feeds it.
//!
//! - **Version**: 2.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Per-receiver bounded queues over WebSocket, replacing the shared broadcast channel
//! - 1.0.0: Initial socket server

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::core::ChannelError;
use crate::ipc::protocol::{encode_event, ChannelEvent, ReminderNotice};
use crate::ipc::NotificationChannel;

/// Maximum number of connected clients
pub const MAX_RECEIVERS: usize = 64;

/// Fan-out point for reminder notifications
///
/// Every connection owns a bounded queue. Publishing never waits: a full queue drops the
/// event for that receiver only, a closed queue is pruned.
pub struct NotificationHub {
    receivers: DashMap<u64, mpsc::Sender<String>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl NotificationHub {
    pub fn new(buffer: usize) -> Self {
        NotificationHub {
            receivers: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Add a receiver; the returned queue yields encoded text frames
    pub fn register(&self) -> Result<(u64, mpsc::Receiver<String>), ChannelError> {
        if self.receivers.len() >= MAX_RECEIVERS {
            return Err(ChannelError::TooManyReceivers(MAX_RECEIVERS));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.receivers.insert(id, tx);
        info!("Client {} connected (total: {})", id, self.receivers.len());
        Ok((id, rx))
    }

    pub fn unregister(&self, id: u64) {
        if self.receivers.remove(&id).is_some() {
            info!("Client {} disconnected (total: {})", id, self.receivers.len());
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    /// Offer an event to every receiver, returning how many accepted it
    pub fn publish(&self, event: &ChannelEvent) -> usize {
        let frame = match encode_event(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("{}", ChannelError::from(e));
                return 0;
            }
        };

        let mut delivered = 0;
        self.receivers.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("{}", ChannelError::ReceiverFull(*id));
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("{}", ChannelError::ReceiverClosed(*id));
                false
            }
        });
        delivered
    }

    pub fn send_heartbeat(&self) {
        let timestamp = chrono::Utc::now().timestamp();
        self.publish(&ChannelEvent::Heartbeat { timestamp });
    }

    /// Router exposing the WebSocket endpoint at `/` and `/ws`
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(upgrade))
            .route("/ws", get(upgrade))
            .with_state(self)
    }

    /// Bind the channel listener and serve it in a background task
    pub async fn start(self: Arc<Self>, port: u16) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        info!("Notification channel listening on {}", addr);

        let app = self.router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Notification channel stopped: {e}");
            }
        });
        Ok(())
    }

    /// Spawn the periodic heartbeat
    pub fn start_heartbeat(self: Arc<Self>, period: std::time::Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.send_heartbeat();
            }
        });
    }
}

impl NotificationChannel for NotificationHub {
    fn broadcast(&self, notice: &ReminderNotice) {
        let delivered = self.publish(&ChannelEvent::from(notice));
        debug!("Reminder {:?} offered to {} client(s)", notice.message, delivered);
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<NotificationHub>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_client(socket, hub))
}

async fn handle_client(socket: WebSocket, hub: Arc<NotificationHub>) {
    let (id, mut frames) = match hub.register() {
        Ok(registered) => registered,
        Err(e) => {
            warn!("Rejecting client: {e}");
            return;
        }
    };
    let (mut sender, mut receiver) = socket.split();

    let write_handle = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = sender.send(Message::Text(frame)).await {
                debug!("Failed to write to client {id}: {e}");
                break;
            }
        }
    });

    // Clients only listen; drain until the socket closes
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Client {id} read error: {e}");
                break;
            }
        }
    }

    hub.unregister(id);
    write_handle.abort();
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notice(message: &str) -> ReminderNotice {
        ReminderNotice {
            message: message.to_string(),
            due_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_receiver() {
        let hub = NotificationHub::new(4);
        let (_, mut first) = hub.register().unwrap();
        let (_, mut second) = hub.register().unwrap();

        hub.broadcast(&notice("Reminder to stretch"));

        for rx in [&mut first, &mut second] {
            let frame = rx.recv().await.unwrap();
            assert!(frame.contains("Reminder to stretch"));
        }
    }

    #[tokio::test]
    async fn test_closed_receiver_is_pruned_silently() {
        let hub = NotificationHub::new(4);
        let (_, closed) = hub.register().unwrap();
        let (_, mut open) = hub.register().unwrap();
        drop(closed);

        let delivered = hub.publish(&ChannelEvent::Heartbeat { timestamp: 1 });

        assert_eq!(delivered, 1);
        assert_eq!(hub.receiver_count(), 1);
        assert!(open.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_receiver_does_not_block() {
        let hub = NotificationHub::new(1);
        let (_, mut slow) = hub.register().unwrap();

        assert_eq!(hub.publish(&ChannelEvent::Heartbeat { timestamp: 1 }), 1);
        assert_eq!(hub.publish(&ChannelEvent::Heartbeat { timestamp: 2 }), 0);

        // Still registered, and only the first event was queued
        assert_eq!(hub.receiver_count(), 1);
        assert!(slow.recv().await.unwrap().contains('1'));
        assert!(slow.try_recv().is_err());
    }

    #[test]
    fn test_receiver_limit() {
        let hub = NotificationHub::new(1);
        let held: Vec<_> = (0..MAX_RECEIVERS).map(|_| hub.register().unwrap()).collect();
        assert!(matches!(
            hub.register(),
            Err(ChannelError::TooManyReceivers(MAX_RECEIVERS))
        ));

        hub.unregister(held[0].0);
        assert!(hub.register().is_ok());
    }
}
