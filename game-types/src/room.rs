use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameId, RoomId, UserId};

pub const MAX_ROOM_PLAYERS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Player,
    Spectator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Spectator => "spectator",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Role::Player),
            "spectator" => Ok(Role::Spectator),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Finished => "finished",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(RoomStatus::Waiting),
            "playing" => Ok(RoomStatus::Playing),
            "finished" => Ok(RoomStatus::Finished),
            other => Err(format!("unknown room status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Participant {
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: String, // ISO 8601 string
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Room {
    pub id: RoomId,
    /// Human-shareable join code, unique across rooms.
    pub code: String,
    pub name: String,
    pub owner_id: UserId,
    pub max_players: u8,
    pub status: RoomStatus,
    /// Join order is preserved.
    pub participants: Vec<Participant>,
    pub active_game_id: Option<GameId>,
    pub created_at: String,
}

impl Room {
    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.role == Role::Player)
    }

    pub fn player_count(&self) -> usize {
        self.players().count()
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.participants.iter().map(|p| p.user_id).collect()
    }
}
