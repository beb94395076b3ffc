use game_types::{
    AI_PLAYER_ID, Board, EventEnvelope, EventScope, GameError, GameId, GameMode, GameResult,
    GameSession, GameStatus, Move, Position, RealtimeEvent, RoomId, Symbol, UserId, WinCondition,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{EventSequencer, Outcome, apply_move, evaluate};

/// One finished game as it should be scored for a single player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerResult {
    pub user_id: UserId,
    pub result: GameResult,
    pub win_condition: Option<WinCondition>,
}

#[derive(Debug, Clone)]
pub struct MoveApplied {
    pub record: Move,
    pub outcome: Outcome,
    pub events: Vec<EventEnvelope>,
    /// Empty unless this move finished the game.
    pub results: Vec<PlayerResult>,
}

/// Authoritative state of one play-through plus its move log.
#[derive(Debug, Clone)]
pub struct Game {
    pub state: GameSession,
    moves: Vec<Move>,
    sequencer: EventSequencer,
}

impl Game {
    /// Starts an empty board with X to move. In `ai` mode the O seat is
    /// always the AI identity, whatever `player_o_id` says.
    pub fn create(
        room_id: Option<RoomId>,
        player_x_id: UserId,
        player_o_id: UserId,
        mode: GameMode,
    ) -> Self {
        let id = Uuid::new_v4();
        let player_o_id = if mode == GameMode::Ai {
            AI_PLAYER_ID
        } else {
            player_o_id
        };

        let state = GameSession {
            id,
            room_id,
            player_x_id,
            player_o_id,
            mode,
            current_player: Symbol::X,
            status: GameStatus::Active,
            board: Board::new(),
            winner_id: None,
            win_condition: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
            move_count: 0,
            degraded: false,
        };

        debug!("Created {} game {} ({} vs {})", mode.as_str(), id, player_x_id, player_o_id);

        Self {
            state,
            moves: Vec::new(),
            sequencer: EventSequencer::new(EventScope::Game(id)),
        }
    }

    pub fn id(&self) -> GameId {
        self.state.id
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_active(&self) -> bool {
        self.state.status == GameStatus::Active
    }

    pub fn is_ai_turn(&self) -> bool {
        self.is_active()
            && self.state.mode == GameMode::Ai
            && self.state.player_for(self.state.current_player) == AI_PLAYER_ID
    }

    pub fn last_sequence(&self) -> u64 {
        self.sequencer.last_sequence()
    }

    pub fn started_event(&mut self) -> EventEnvelope {
        self.sequencer.stamp(RealtimeEvent::GameStarted {
            game: self.state.clone(),
        })
    }

    pub fn submit_move(
        &mut self,
        player_id: UserId,
        position: Position,
    ) -> Result<MoveApplied, GameError> {
        if self.state.status != GameStatus::Active {
            return Err(GameError::GameNotActive);
        }
        let symbol = self
            .state
            .symbol_of(player_id)
            .ok_or(GameError::NotParticipant)?;
        if symbol != self.state.current_player {
            return Err(GameError::NotPlayersTurn);
        }

        let board = apply_move(&self.state.board, position, symbol)?;

        let record = Move {
            game_id: self.state.id,
            player_id,
            position,
            symbol,
            move_number: self.state.move_count + 1,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        self.state.board = board;
        self.state.move_count = record.move_number;
        self.state.current_player = symbol.opponent();
        self.moves.push(record.clone());

        let outcome = evaluate(&self.state.board, position);
        let mut events = Vec::with_capacity(2);

        match &outcome {
            Outcome::Continue => {
                events.push(self.sequencer.stamp(RealtimeEvent::Move {
                    game_id: self.state.id,
                    move_record: record.clone(),
                    board: self.state.board.clone(),
                    current_player: self.state.current_player,
                }));
            }
            Outcome::Win {
                condition, line, ..
            } => {
                self.finish(Some(player_id), *condition);
                events.push(self.sequencer.stamp(RealtimeEvent::WinningMove {
                    game_id: self.state.id,
                    move_record: record.clone(),
                    board: self.state.board.clone(),
                    line: line.clone(),
                    winner_id: player_id,
                    win_condition: *condition,
                }));
                events.push(self.game_over_event());
            }
            Outcome::Draw => {
                self.finish(None, WinCondition::Draw);
                events.push(self.sequencer.stamp(RealtimeEvent::Move {
                    game_id: self.state.id,
                    move_record: record.clone(),
                    board: self.state.board.clone(),
                    current_player: self.state.current_player,
                }));
                events.push(self.game_over_event());
            }
        }

        Ok(MoveApplied {
            record,
            outcome,
            events,
            results: self.scored_results(),
        })
    }

    /// A participant leaves for good. Abandonment is never scored.
    pub fn abandon(&mut self, by_player: UserId) -> Result<EventEnvelope, GameError> {
        if self.state.status != GameStatus::Active {
            return Err(GameError::GameNotActive);
        }
        if !self.state.is_participant(by_player) {
            return Err(GameError::NotParticipant);
        }
        info!("Game {} abandoned by {}", self.state.id, by_player);
        Ok(self.mark_abandoned())
    }

    /// Abandons an idle game on the server's behalf. `None` if already over.
    pub fn expire(&mut self) -> Option<EventEnvelope> {
        if self.state.status != GameStatus::Active {
            return None;
        }
        info!("Game {} expired without activity", self.state.id);
        Some(self.mark_abandoned())
    }

    /// Per-player results worth recording. The AI seat is never scored and
    /// neither is pass-play, where one user holds both seats.
    pub fn scored_results(&self) -> Vec<PlayerResult> {
        if self.state.status != GameStatus::Finished || self.state.mode == GameMode::PassPlay {
            return Vec::new();
        }
        [self.state.player_x_id, self.state.player_o_id]
            .into_iter()
            .filter(|id| *id != AI_PLAYER_ID)
            .filter_map(|user_id| {
                self.state.result_for(user_id).map(|result| PlayerResult {
                    user_id,
                    result,
                    win_condition: self.state.win_condition,
                })
            })
            .collect()
    }

    fn finish(&mut self, winner_id: Option<UserId>, condition: WinCondition) {
        self.state.status = GameStatus::Finished;
        self.state.winner_id = winner_id;
        self.state.win_condition = Some(condition);
        self.state.finished_at = Some(chrono::Utc::now().to_rfc3339());
        info!(
            "Game {} finished after {} moves ({})",
            self.state.id,
            self.state.move_count,
            condition.as_str()
        );
    }

    fn mark_abandoned(&mut self) -> EventEnvelope {
        self.state.status = GameStatus::Abandoned;
        self.state.finished_at = Some(chrono::Utc::now().to_rfc3339());
        self.game_over_event()
    }

    fn game_over_event(&mut self) -> EventEnvelope {
        self.sequencer.stamp(RealtimeEvent::GameOver {
            game_id: self.state.id,
            status: self.state.status,
            winner_id: self.state.winner_id,
            win_condition: self.state.win_condition,
        })
    }
}
