use std::sync::Arc;

use dashmap::DashMap;
use game_core::EventSequencer;
use game_types::{EventEnvelope, EventScope, RealtimeEvent, Room, ServerMessage, UserId};
use tracing::debug;

use crate::presence::{PresenceRegistry, PresenceSnapshot};
use crate::websocket::connection::ConnectionManager;

/// Fans sequenced events out to connected users.
pub struct Broadcaster {
    connections: Arc<ConnectionManager>,
    presence: Arc<PresenceRegistry>,
    user_sequences: DashMap<UserId, EventSequencer>,
}

impl Broadcaster {
    pub fn new(connections: Arc<ConnectionManager>, presence: Arc<PresenceRegistry>) -> Self {
        Self {
            connections,
            presence,
            user_sequences: DashMap::new(),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub async fn send_message(&self, user_id: UserId, message: ServerMessage) -> usize {
        self.connections.send_to_user(user_id, message).await
    }

    pub async fn send_to_users(&self, user_ids: &[UserId], envelope: EventEnvelope) {
        self.connections
            .send_to_users(user_ids, ServerMessage::Event { envelope })
            .await;
    }

    /// Every current participant of the room, spectators included.
    pub async fn send_to_room(&self, room: &Room, envelope: EventEnvelope) {
        debug!(
            "Room {} event #{} to {} members",
            room.id,
            envelope.sequence,
            room.participants.len()
        );
        self.send_to_users(&room.member_ids(), envelope).await;
    }

    /// Sends an event on the user's private stream.
    pub async fn notify_user(&self, user_id: UserId, event: RealtimeEvent) -> EventEnvelope {
        let envelope = self
            .user_sequences
            .entry(user_id)
            .or_insert_with(|| EventSequencer::new(EventScope::User(user_id)))
            .stamp(event);
        self.send_to_users(&[user_id], envelope.clone()).await;
        envelope
    }

    pub async fn user_online(&self, user_id: UserId) {
        if let Some(snapshot) = self.presence.connect(user_id) {
            self.presence_changed(snapshot).await;
        }
    }

    pub async fn user_offline(&self, user_id: UserId) {
        if let Some(snapshot) = self.presence.disconnect(user_id) {
            self.presence_changed(snapshot).await;
        }
    }

    async fn presence_changed(&self, snapshot: PresenceSnapshot) {
        let envelope = presence_envelope(snapshot);
        self.connections
            .send_to_authenticated(ServerMessage::Event { envelope })
            .await;
    }
}

pub fn presence_envelope(snapshot: PresenceSnapshot) -> EventEnvelope {
    let count = snapshot.online_users.len() as u32;
    EventEnvelope {
        scope: EventScope::Presence,
        sequence: snapshot.version,
        event: RealtimeEvent::OnlineUsersUpdate {
            online_users: snapshot.online_users,
            count,
        },
    }
}
