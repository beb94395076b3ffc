use game_types::{ServerMessage, UserId, UserProfile};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub user: Option<UserProfile>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            user: None,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Open sockets and which user each one belongs to. A user may hold
/// several connections at once.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    user_connections: RwLock<HashMap<UserId, Vec<ConnectionId>>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            user_connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    /// Returns the user the connection was signed in as, if any.
    pub async fn remove_connection(&self, id: ConnectionId) -> Option<UserId> {
        let user_id = {
            let mut connections = self.connections.write().await;
            connections.remove(&id).and_then(|conn| conn.user_id())
        };

        if let Some(user_id) = user_id {
            let mut user_connections = self.user_connections.write().await;
            if let Some(ids) = user_connections.get_mut(&user_id) {
                ids.retain(|c| *c != id);
                if ids.is_empty() {
                    user_connections.remove(&user_id);
                }
            }
        }
        user_id
    }

    pub async fn authenticated_user(&self, id: ConnectionId) -> Option<UserProfile> {
        let connections = self.connections.read().await;
        connections.get(&id).and_then(|c| c.user.clone())
    }

    pub async fn authenticate_connection(
        &self,
        id: ConnectionId,
        user: UserProfile,
    ) -> Result<(), String> {
        let user_id = user.id;
        {
            let mut connections = self.connections.write().await;
            let connection = connections.get_mut(&id).ok_or("Connection not found")?;
            match connection.user_id() {
                Some(existing) if existing != user_id => {
                    return Err("Connection already authenticated".to_string());
                }
                Some(_) => {
                    connection.user = Some(user);
                    return Ok(());
                }
                None => connection.user = Some(user),
            }
        }

        {
            let mut user_connections = self.user_connections.write().await;
            user_connections.entry(user_id).or_default().push(id);
        }

        Ok(())
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    /// Delivers to every open connection of the user; returns how many got it.
    pub async fn send_to_user(&self, user_id: UserId, message: ServerMessage) -> usize {
        let connection_ids = {
            let user_connections = self.user_connections.read().await;
            user_connections.get(&user_id).cloned().unwrap_or_default()
        };

        let connections = self.connections.read().await;
        connection_ids
            .iter()
            .filter_map(|id| connections.get(id))
            .filter(|conn| conn.send_message(message.clone()).is_ok())
            .count()
    }

    pub async fn send_to_users(&self, user_ids: &[UserId], message: ServerMessage) {
        for user_id in user_ids {
            self.send_to_user(*user_id, message.clone()).await;
        }
    }

    pub async fn send_to_authenticated(&self, message: ServerMessage) {
        let connections = self.connections.read().await;
        for connection in connections.values().filter(|c| c.is_authenticated()) {
            let _ = connection.send_message(message.clone());
        }
    }

    /// Drops idle connections and returns the users they belonged to.
    pub async fn cleanup_inactive_connections(&self, timeout: Duration) -> Vec<UserId> {
        let inactive_connections: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        let mut users = Vec::new();
        for connection_id in inactive_connections {
            tracing::info!("Removing inactive connection: {}", connection_id);
            if let Some(user_id) = self.remove_connection(connection_id).await {
                users.push(user_id);
            }
        }
        users
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn user_connection_count(&self) -> usize {
        let user_connections = self.user_connections.read().await;
        user_connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn profile() -> UserProfile {
        UserProfile::new(Uuid::new_v4(), "Tester")
    }

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        assert_eq!(manager.remove_connection(conn_id).await, None);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_user_with_two_connections() {
        let manager = ConnectionManager::new();
        let user = profile();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        let mut rx1 = manager.create_connection(first).await;
        let mut rx2 = manager.create_connection(second).await;
        manager.authenticate_connection(first, user.clone()).await.unwrap();
        manager.authenticate_connection(second, user.clone()).await.unwrap();
        assert_eq!(manager.user_connection_count().await, 1);

        let delivered = manager
            .send_to_user(user.id, ServerMessage::QueueLeft)
            .await;
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());

        assert_eq!(manager.remove_connection(first).await, Some(user.id));
        assert_eq!(manager.user_connection_count().await, 1);
        manager.remove_connection(second).await;
        assert_eq!(manager.user_connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_cannot_switch_users() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let _receiver = manager.create_connection(conn_id).await;

        manager.authenticate_connection(conn_id, profile()).await.unwrap();
        let result = manager.authenticate_connection(conn_id, profile()).await;
        assert_eq!(result.unwrap_err(), "Connection already authenticated");
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();
        let user = profile();

        let _receiver = manager.create_connection(conn_id).await;
        manager.authenticate_connection(conn_id, user.clone()).await.unwrap();

        let short_timeout = Duration::from_millis(10);
        assert!(manager.cleanup_inactive_connections(short_timeout).await.is_empty());
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let removed = manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(removed, vec![user.id]);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager
            .send_to_connection(conn_id, ServerMessage::QueueLeft)
            .await;
        assert_eq!(result.unwrap_err(), "Connection closed");

        let missing = manager
            .send_to_connection(ConnectionId::new(), ServerMessage::QueueLeft)
            .await;
        assert_eq!(missing.unwrap_err(), "Connection not found");
    }

    #[tokio::test]
    async fn test_broadcast_skips_anonymous_connections() {
        let manager = ConnectionManager::new();
        let signed_in = ConnectionId::new();
        let anonymous = ConnectionId::new();
        let mut rx_signed = manager.create_connection(signed_in).await;
        let mut rx_anon = manager.create_connection(anonymous).await;
        manager.authenticate_connection(signed_in, profile()).await.unwrap();

        manager.send_to_authenticated(ServerMessage::QueueLeft).await;
        assert!(rx_signed.try_recv().is_ok());
        assert!(rx_anon.try_recv().is_err());
    }
}
