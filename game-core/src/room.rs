use game_types::{
    EventEnvelope, EventScope, GameError, GameId, GameMode, MAX_ROOM_PLAYERS, Participant,
    RealtimeEvent, Role, Room, RoomId, RoomStatus, UserId,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{EventSequencer, Game};

pub const ROOM_CODE_LENGTH: usize = 6;

// No 0/O or 1/I so codes survive being read aloud.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_room_code() -> String {
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(ROOM_CODE_LENGTH)
        .map(|b| ROOM_CODE_ALPHABET[*b as usize % ROOM_CODE_ALPHABET.len()] as char)
        .collect()
}

/// Trims and uppercases user-typed codes before lookup.
pub fn normalize_room_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEndReason {
    OwnerLeft,
    Empty,
}

impl RoomEndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomEndReason::OwnerLeft => "owner_left",
            RoomEndReason::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub participant: Participant,
    /// Session the caller must abandon because a player walked out of it.
    pub abandon_game: Option<GameId>,
    pub ended: Option<RoomEndReason>,
    pub events: Vec<EventEnvelope>,
}

/// Room membership plus the room-scoped event stream.
#[derive(Debug, Clone)]
pub struct GameRoom {
    pub room: Room,
    sequencer: EventSequencer,
}

impl GameRoom {
    pub fn create(code: String, name: String, owner_id: UserId) -> Self {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now().to_rfc3339();
        let room = Room {
            id,
            code,
            name,
            owner_id,
            max_players: MAX_ROOM_PLAYERS,
            status: RoomStatus::Waiting,
            participants: vec![Participant {
                user_id: owner_id,
                role: Role::Player,
                joined_at: now.clone(),
            }],
            active_game_id: None,
            created_at: now,
        };
        info!("Room {} ({}) created by {}", room.code, id, owner_id);
        Self {
            room,
            sequencer: EventSequencer::new(EventScope::Room(id)),
        }
    }

    pub fn id(&self) -> RoomId {
        self.room.id
    }

    pub fn is_closed(&self) -> bool {
        self.room.status == RoomStatus::Finished
    }

    pub fn join(&mut self, user_id: UserId, role: Role) -> Result<EventEnvelope, GameError> {
        if self.is_closed() {
            return Err(GameError::RoomClosed);
        }
        if self.room.participant(user_id).is_some() {
            return Err(GameError::AlreadyJoined);
        }
        if role == Role::Player && self.room.player_count() >= self.room.max_players as usize {
            return Err(GameError::RoomFull);
        }

        let participant = Participant {
            user_id,
            role,
            joined_at: chrono::Utc::now().to_rfc3339(),
        };
        self.room.participants.push(participant.clone());
        debug!("User {} joined room {} as {}", user_id, self.room.code, role.as_str());

        Ok(self.sequencer.stamp(RealtimeEvent::PlayerJoined {
            room_id: self.room.id,
            participant,
        }))
    }

    pub fn leave(&mut self, user_id: UserId) -> Result<LeaveOutcome, GameError> {
        let index = self
            .room
            .participants
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or(GameError::NotInRoom)?;
        let participant = self.room.participants.remove(index);
        let was_player = participant.role == Role::Player;

        let abandon_game = if was_player {
            self.room.active_game_id.take()
        } else {
            None
        };

        let mut events = vec![self.sequencer.stamp(RealtimeEvent::PlayerLeft {
            room_id: self.room.id,
            user_id,
        })];

        let ended = if was_player && user_id == self.room.owner_id {
            Some(RoomEndReason::OwnerLeft)
        } else if self.room.participants.is_empty() {
            Some(RoomEndReason::Empty)
        } else {
            None
        };

        // A room that has played keeps its `playing` label until it closes.
        if let Some(reason) = ended {
            events.push(self.close(reason));
        }

        debug!("User {} left room {}", user_id, self.room.code);
        Ok(LeaveOutcome {
            participant,
            abandon_game,
            ended,
            events,
        })
    }

    /// Seats the first-joined player as X. Rematches go through here too.
    pub fn start_game(&mut self) -> Result<Game, GameError> {
        if self.is_closed() {
            return Err(GameError::RoomClosed);
        }
        if self.room.active_game_id.is_some() {
            return Err(GameError::GameInProgress);
        }
        let players: Vec<UserId> = self.room.players().map(|p| p.user_id).collect();
        let [player_x, player_o] = players[..] else {
            return Err(GameError::InsufficientPlayers);
        };

        let game = Game::create(Some(self.room.id), player_x, player_o, GameMode::Online);
        self.room.active_game_id = Some(game.id());
        self.room.status = RoomStatus::Playing;
        info!("Room {} started game {}", self.room.code, game.id());
        Ok(game)
    }

    /// Frees the room for a rematch once its session is over.
    pub fn game_ended(&mut self, game_id: GameId) {
        if self.room.active_game_id == Some(game_id) {
            self.room.active_game_id = None;
        }
    }

    pub fn close(&mut self, reason: RoomEndReason) -> EventEnvelope {
        self.room.status = RoomStatus::Finished;
        info!("Room {} closed: {}", self.room.code, reason.as_str());
        self.sequencer.stamp(RealtimeEvent::RoomEnded {
            room_id: self.room.id,
            reason: reason.as_str().to_string(),
        })
    }

    /// Chat content is opaque; only membership is checked.
    pub fn chat(&mut self, from: UserId, message: String) -> Result<EventEnvelope, GameError> {
        if self.room.participant(from).is_none() {
            return Err(GameError::NotInRoom);
        }
        Ok(self.sequencer.stamp(RealtimeEvent::Chat {
            room_id: self.room.id,
            from,
            message,
        }))
    }
}
