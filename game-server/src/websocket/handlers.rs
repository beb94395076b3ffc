use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::AuthService;
use crate::errors::ServiceError;
use crate::game_manager::GameManager;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use game_types::{ClientMessage, GameError, ServerMessage, UserProfile};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    game_manager: Arc<GameManager>,
    auth_service: Arc<AuthService>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        game_manager: Arc<GameManager>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            game_manager,
            auth_service,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        let message = match message {
            ClientMessage::Authenticate { token } => return self.handle_authenticate(token).await,
            ClientMessage::Heartbeat => return Ok(()),
            other => other,
        };

        let Some(user) = self
            .connection_manager
            .authenticated_user(self.connection_id)
            .await
        else {
            return self
                .send_message(ServerMessage::rejected(GameError::AuthenticationRequired))
                .await;
        };

        if let ClientMessage::JoinQueue = message {
            return self.handle_join_queue(&user).await;
        }

        match self.dispatch(&user, message).await {
            Ok(Some(reply)) => self.send_message(reply).await,
            Ok(None) => Ok(()),
            Err(e) => self.send_error(&user, e).await,
        }
    }

    /// Runs one request for a signed-in user. Most outcomes reach the
    /// client as broadcast events, so only a few requests get a direct reply.
    async fn dispatch(
        &self,
        user: &UserProfile,
        message: ClientMessage,
    ) -> Result<Option<ServerMessage>, ServiceError> {
        let games = &self.game_manager;
        let user_id = user.id;

        match message {
            ClientMessage::CreateRoom { name } => {
                let room = games.create_room(user_id, name).await?;
                Ok(Some(ServerMessage::RoomJoined { room }))
            }
            ClientMessage::JoinRoom { code, role } => {
                let room = games.join_room(user_id, &code, role).await?;
                Ok(Some(ServerMessage::RoomJoined { room }))
            }
            ClientMessage::LeaveRoom => {
                let room = games.leave_room(user_id).await?;
                Ok(Some(ServerMessage::RoomLeft { room_id: room.id }))
            }
            ClientMessage::StartGame => {
                games.start_game(user_id).await?;
                Ok(None)
            }
            ClientMessage::SubmitMove { game_id, position } => {
                games.submit_move(user_id, game_id, position).await?;
                Ok(None)
            }
            ClientMessage::StartAiGame { difficulty } => {
                games.start_ai_game(user_id, difficulty).await?;
                Ok(None)
            }
            ClientMessage::StartPassPlayGame => {
                games.start_pass_play_game(user_id).await?;
                Ok(None)
            }
            ClientMessage::RetryAiMove { game_id } => {
                games.retry_ai_move(user_id, game_id).await?;
                Ok(None)
            }
            ClientMessage::AbandonGame { game_id } => {
                games.abandon_game(user_id, game_id).await?;
                Ok(None)
            }
            ClientMessage::LeaveQueue => {
                games.leave_queue(user_id).await;
                Ok(Some(ServerMessage::QueueLeft))
            }
            ClientMessage::Chat { message } => {
                games.chat(user_id, message).await?;
                Ok(None)
            }
            ClientMessage::BlockUser { user_id: blocked_id } => {
                let blocked = games.block_user(user_id, blocked_id).await?;
                Ok(Some(ServerMessage::BlockList { blocked }))
            }
            ClientMessage::UnblockUser { user_id: blocked_id } => {
                let blocked = games.unblock_user(user_id, blocked_id).await?;
                Ok(Some(ServerMessage::BlockList { blocked }))
            }
            ClientMessage::Authenticate { .. } | ClientMessage::JoinQueue | ClientMessage::Heartbeat => {
                Ok(None)
            }
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);

        if let Some(user_id) = self
            .connection_manager
            .remove_connection(self.connection_id)
            .await
        {
            self.game_manager.handle_disconnect(user_id).await;
        }
    }

    async fn handle_authenticate(&self, token: String) -> Result<(), String> {
        info!("Authenticating connection {}", self.connection_id);

        let user = match self.auth_service.validate_token(&token) {
            Ok(user) => user,
            Err(e) => {
                warn!(
                    "Authentication failed for connection {}: {}",
                    self.connection_id, e
                );
                return self
                    .send_message(ServerMessage::AuthenticationFailed {
                        reason: e.to_string(),
                    })
                    .await;
            }
        };

        let first_sign_in = self
            .connection_manager
            .authenticated_user(self.connection_id)
            .await
            .is_none();

        let user = self.game_manager.remember_user(&user).await;
        if let Err(reason) = self
            .connection_manager
            .authenticate_connection(self.connection_id, user.clone())
            .await
        {
            warn!("Connection {} rejected sign-in: {}", self.connection_id, reason);
            return self
                .send_message(ServerMessage::AuthenticationFailed { reason })
                .await;
        }

        if first_sign_in {
            self.game_manager.handle_connect(user.id).await;
        }
        self.send_message(ServerMessage::AuthenticationSuccess { user })
            .await
    }

    async fn handle_join_queue(&self, user: &UserProfile) -> Result<(), String> {
        match self.game_manager.join_queue(user.id).await {
            Ok(position) => {
                self.send_message(ServerMessage::QueueJoined { position })
                    .await?;
                let started = self.game_manager.match_waiting_players().await;
                if !started.is_empty() {
                    debug!("Queue join by {} started {} games", user.id, started.len());
                }
                Ok(())
            }
            Err(e) => self.send_error(user, e).await,
        }
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    async fn send_error(&self, user: &UserProfile, error: ServiceError) -> Result<(), String> {
        match &error {
            ServiceError::Rejected(reason) => {
                debug!("Rejected request from {}: {}", user.id, reason)
            }
            ServiceError::OpponentTimeout { game_id } => {
                info!("AI opponent timed out in game {}", game_id)
            }
            ServiceError::Storage(e) => warn!("Storage failure for {}: {:#}", user.id, e),
        }
        self.send_message(error.to_message()).await
    }
}
