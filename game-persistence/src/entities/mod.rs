pub mod achievements;
pub mod blocked_users;
pub mod games;
pub mod moves;
pub mod room_participants;
pub mod rooms;
pub mod user_themes;
pub mod users;

pub mod prelude {
    pub use super::achievements::Entity as Achievements;
    pub use super::blocked_users::Entity as BlockedUsers;
    pub use super::games::Entity as Games;
    pub use super::moves::Entity as Moves;
    pub use super::room_participants::Entity as RoomParticipants;
    pub use super::rooms::Entity as Rooms;
    pub use super::user_themes::Entity as UserThemes;
    pub use super::users::Entity as Users;
}
