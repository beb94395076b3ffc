use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    BlockedUser, Board, Difficulty, GameError, GameId, GameSession, GameStatus, Move, Participant,
    Position, Role, Room, RoomId, Symbol, UserId, UserProfile, WinCondition,
};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Authenticate { token: String },
    CreateRoom { name: String },
    JoinRoom { code: String, role: Role },
    LeaveRoom,
    StartGame,
    SubmitMove { game_id: GameId, position: Position },
    StartAiGame { difficulty: Difficulty },
    StartPassPlayGame,
    RetryAiMove { game_id: GameId },
    AbandonGame { game_id: GameId },
    JoinQueue,
    LeaveQueue,
    Chat { message: String },
    BlockUser { user_id: UserId },
    UnblockUser { user_id: UserId },
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    AuthenticationSuccess { user: UserProfile },
    AuthenticationFailed { reason: String },
    RoomJoined { room: Room },
    RoomLeft { room_id: RoomId },
    QueueJoined { position: u32 },
    QueueLeft,
    GameState { game: GameSession },
    Event { envelope: EventEnvelope },
    Rejected { error: GameError, message: String },
    OpponentTimeout { game_id: GameId },
    BlockList { blocked: Vec<BlockedUser> },
    Error { message: String },
}

impl ServerMessage {
    pub fn rejected(error: GameError) -> Self {
        ServerMessage::Rejected {
            message: error.to_string(),
            error,
        }
    }
}

/// Ordering domain of an event. Sequences are only comparable within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[ts(export)]
pub enum EventScope {
    Game(GameId),
    Room(RoomId),
    User(UserId),
    Presence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventEnvelope {
    pub scope: EventScope,
    pub sequence: u64,
    pub event: RealtimeEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum RealtimeEvent {
    GameStarted {
        game: GameSession,
    },
    Move {
        game_id: GameId,
        move_record: Move,
        board: Board,
        current_player: Symbol,
    },
    WinningMove {
        game_id: GameId,
        move_record: Move,
        board: Board,
        line: Vec<Position>,
        winner_id: UserId,
        win_condition: WinCondition,
    },
    GameOver {
        game_id: GameId,
        status: GameStatus,
        winner_id: Option<UserId>,
        win_condition: Option<WinCondition>,
    },
    MatchFound {
        room: Room,
        game_id: GameId,
    },
    RoomEnded {
        room_id: RoomId,
        reason: String,
    },
    PlayerJoined {
        room_id: RoomId,
        participant: Participant,
    },
    PlayerLeft {
        room_id: RoomId,
        user_id: UserId,
    },
    OnlineUsersUpdate {
        online_users: Vec<UserId>,
        count: u32,
    },
    Chat {
        room_id: RoomId,
        from: UserId,
        message: String,
    },
}
