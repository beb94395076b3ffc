pub mod errors;
pub mod game;
pub mod messages;
pub mod room;
pub mod user;

use uuid::Uuid;

pub type GameId = Uuid;
pub type RoomId = Uuid;
pub type UserId = Uuid;

/// Seat identity used for the computer opponent in `ai` mode.
pub const AI_PLAYER_ID: UserId = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_00a1);

// Re-export all types
pub use errors::*;
pub use game::*;
pub use messages::*;
pub use room::*;
pub use user::*;
