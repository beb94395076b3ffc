use game_types::{GameError, GameId, ServerMessage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rejected(#[from] GameError),
    #[error("the computer opponent did not answer in time")]
    OpponentTimeout { game_id: GameId },
    #[error("storage unavailable: {0}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    /// What the originating client is told.
    pub fn to_message(&self) -> ServerMessage {
        match self {
            ServiceError::Rejected(error) => ServerMessage::rejected(error.clone()),
            ServiceError::OpponentTimeout { game_id } => {
                ServerMessage::OpponentTimeout { game_id: *game_id }
            }
            ServiceError::Storage(_) => ServerMessage::Error {
                message: "Service temporarily unavailable".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_details_stay_on_the_server() {
        let error = ServiceError::Storage(anyhow::anyhow!("disk I/O error at /var/lib/db"));
        match error.to_message() {
            ServerMessage::Error { message } => assert!(!message.contains("/var/lib")),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_rejection_converts_from_game_error() {
        let error: ServiceError = GameError::RoomFull.into();
        assert!(matches!(error, ServiceError::Rejected(GameError::RoomFull)));
        assert_eq!(error.to_string(), "both player seats are taken");
    }
}
