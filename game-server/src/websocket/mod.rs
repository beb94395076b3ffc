use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::auth::AuthService;
use crate::game_manager::GameManager;
use game_types::{ClientMessage, ServerMessage};

pub mod connection;
pub mod handlers;
pub mod rate_limiter;

use connection::ConnectionId;
pub use connection::ConnectionManager;
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub burst: u32,
    pub refill: Duration,
}

pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    game_manager: Arc<GameManager>,
    auth_service: Arc<AuthService>,
    rate_limit: RateLimit,
) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let message_receiver = connection_manager.create_connection(connection_id).await;

    let message_handler = MessageHandler::new(
        connection_id,
        connection_manager.clone(),
        game_manager,
        auth_service,
    );

    let incoming_handler = {
        let connection_manager = connection_manager.clone();
        let message_handler = message_handler.clone();
        let mut rate_limiter = RateLimiter::new_with_limits(rate_limit.burst, rate_limit.refill);

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) if msg.is_close() => break,
                    Ok(msg) => {
                        let outcome = handle_message(
                            msg,
                            &mut rate_limiter,
                            &message_handler,
                            &connection_manager,
                            connection_id,
                        )
                        .await;
                        if let Err(e) = outcome {
                            error!("Error handling message for {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect().await;
}

/// Errors returned here end the connection; bad frames are answered and
/// dropped.
async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_manager: &ConnectionManager,
    connection_id: ConnectionId,
) -> Result<(), String> {
    if !msg.is_text() {
        return Ok(());
    }

    if !rate_limiter.check_rate_limit() {
        warn!("Rate limit exceeded for connection {}", connection_id);
        return reply_error(connection_manager, connection_id, "Rate limit exceeded").await;
    }

    let text = msg.to_str().map_err(|_| "Invalid text message".to_string())?;

    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Invalid message from {}: {}", connection_id, e);
            let reason = format!("Invalid JSON message: {}", e);
            return reply_error(connection_manager, connection_id, &reason).await;
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))
}

async fn reply_error(
    connection_manager: &ConnectionManager,
    connection_id: ConnectionId,
    message: &str,
) -> Result<(), String> {
    connection_manager
        .send_to_connection(
            connection_id,
            ServerMessage::Error {
                message: message.to_string(),
            },
        )
        .await
}
