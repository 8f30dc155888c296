use crate::game::core::messages::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Context for a WebSocket connection
pub struct ConnectionContext {
    pub connection_id: String,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for handling WebSocket messages and disconnections
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handle an incoming client message
    fn handle_message(
        self: Arc<Self>,
        msg: ClientMessage,
        tx: broadcast::Sender<ServerMessage>,
        ctx: &mut ConnectionContext,
    ) -> impl Future<Output = ()> + Send;

    /// Handle client disconnection
    fn handle_disconnect(self: Arc<Self>, connection_id: String) -> impl Future<Output = ()> + Send;

    /// Name for logging purposes
    fn name(&self) -> &'static str;
}

/// Run a WebSocket connection with the given handler.
/// Splits the socket, runs send and receive tasks, and reports the
/// disconnect once either side finishes.
pub async fn run_connection<H: ConnectionHandler>(socket: WebSocket, handler: Arc<H>) {
    let ctx = ConnectionContext::new();
    let connection_id = ctx.connection_id.clone();
    info!(connection_id, "New {} WebSocket connection", handler.name());

    let (mut sender, receiver) = socket.split();
    let (tx, mut rx) = broadcast::channel::<ServerMessage>(CHANNEL_CAPACITY);

    // Task to send messages from the broadcast channel to the WebSocket
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = match rx.recv().await {
                Ok(msg) => msg,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Client lagging, dropped messages");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            debug!(?msg, "Sending message to client");
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(err) => {
                    warn!(%err, "Failed to serialize server message");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
            if msg.closes_connection() {
                let _ = sender.close().await;
                break;
            }
        }
    });

    // Task to receive messages from the WebSocket and dispatch to handler
    let mut recv_task = tokio::spawn(receive_loop(receiver, tx, handler.clone(), ctx));

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    handler.clone().handle_disconnect(connection_id.clone()).await;
    info!(connection_id, "{} WebSocket connection closed", handler.name());
}

async fn receive_loop<H: ConnectionHandler>(
    mut receiver: futures_util::stream::SplitStream<WebSocket>,
    tx: broadcast::Sender<ServerMessage>,
    handler: Arc<H>,
    mut ctx: ConnectionContext,
) {
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            debug!("Received non-text message, ignoring");
            continue;
        };

        debug!(raw = %text, "Received message");

        let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
            warn!(raw = %text, "Failed to parse client message");
            continue;
        };

        handler.clone().handle_message(client_msg, tx.clone(), &mut ctx).await;
    }
}
