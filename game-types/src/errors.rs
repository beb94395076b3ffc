use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::Position;

/// Client-caused rejections. Always recoverable; the state they were
/// raised against is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GameError {
    #[error("position {position} is already taken")]
    PositionOccupied { position: Position },
    #[error("position {position} is not on the board (1-15)")]
    PositionOutOfRange { position: Position },
    #[error("it is not your turn")]
    NotPlayersTurn,
    #[error("you are not playing in this game")]
    NotParticipant,
    #[error("the game is no longer active")]
    GameNotActive,
    #[error("both player seats are taken")]
    RoomFull,
    #[error("you are already in this room")]
    AlreadyJoined,
    #[error("two players are needed to start")]
    InsufficientPlayers,
    #[error("a game is already in progress in this room")]
    GameInProgress,
    #[error("room not found")]
    RoomNotFound,
    #[error("game not found")]
    GameNotFound,
    #[error("you are not in a room")]
    NotInRoom,
    #[error("this room has ended")]
    RoomClosed,
    #[error("'{code}' is not a valid room code")]
    InvalidRoomCode { code: String },
    #[error("you are already waiting for a match")]
    AlreadyQueued,
    #[error("sign in first")]
    AuthenticationRequired,
    #[error("one of you has blocked the other")]
    Blocked,
    #[error("you cannot block yourself")]
    CannotBlockSelf,
}
