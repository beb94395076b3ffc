pub mod achievement_repository;
pub mod block_repository;
pub mod game_repository;
pub mod room_repository;
pub mod user_repository;

pub use achievement_repository::AchievementRepository;
pub use block_repository::BlockRepository;
pub use game_repository::GameRepository;
pub use room_repository::RoomRepository;
pub use user_repository::UserRepository;

use sea_orm::prelude::DateTimeWithTimeZone;

/// Wire timestamps are RFC 3339 strings; unparseable ones become "now".
pub(crate) fn parse_timestamp(value: &str) -> DateTimeWithTimeZone {
    chrono::DateTime::parse_from_rfc3339(value).unwrap_or_else(|_| chrono::Utc::now().into())
}

pub(crate) fn format_timestamp(value: &DateTimeWithTimeZone) -> String {
    value.to_rfc3339()
}
