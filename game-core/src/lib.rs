pub mod achievements;
pub mod game_state;
pub mod rankings;
pub mod room;
pub mod rules;
pub mod sequence;

// Re-export main components
pub use achievements::*;
pub use game_state::*;
pub use rankings::*;
pub use room::*;
pub use rules::*;
pub use sequence::*;
