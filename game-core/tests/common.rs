#![allow(dead_code)]

use game_core::{Game, GameRoom, MoveApplied, SequenceGuard, generate_room_code};
use game_types::{EventEnvelope, Position, Role, UserId};
use uuid::Uuid;

/// Creates a room whose owner and one guest hold both player seats
pub fn create_full_room() -> (GameRoom, UserId, UserId) {
    let owner = Uuid::new_v4();
    let guest = Uuid::new_v4();
    let mut room = GameRoom::create(generate_room_code(), "Arena".to_string(), owner);
    room.join(guest, Role::Player).expect("guest should get the second seat");
    (room, owner, guest)
}

/// Plays alternating moves, X first, and returns the last result
pub fn play_alternating(game: &mut Game, x_moves: &[Position], o_moves: &[Position]) -> MoveApplied {
    let player_x = game.state.player_x_id;
    let player_o = game.state.player_o_id;
    let mut last = None;
    for turn in 0..x_moves.len().max(o_moves.len()) {
        if let Some(&position) = x_moves.get(turn) {
            last = Some(game.submit_move(player_x, position).expect("X move should apply"));
        }
        if let Some(&position) = o_moves.get(turn) {
            last = Some(game.submit_move(player_o, position).expect("O move should apply"));
        }
    }
    last.expect("at least one move")
}

/// Receiver that records which envelopes it applied
#[derive(Default)]
pub struct EventCollector {
    guard: SequenceGuard,
    pub applied: Vec<EventEnvelope>,
}

impl EventCollector {
    pub fn receive(&mut self, envelope: EventEnvelope) {
        if self.guard.accept(&envelope) {
            self.applied.push(envelope);
        }
    }
}
