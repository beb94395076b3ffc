use async_trait::async_trait;
use game_core::{Outcome, apply_move, evaluate};
use game_types::{Board, Difficulty, Position, Symbol};

/// Picks the computer's move. Implementations may be slow or remote; the
/// game manager bounds every call with a timeout.
#[async_trait]
pub trait MoveProvider: Send + Sync {
    /// `None` when the board has no open cell.
    async fn choose_move(&self, board: &Board, symbol: Symbol, difficulty: Difficulty)
    -> Option<Position>;
}

/// Cells tried in order once there is nothing to win or block.
const PREFERRED_CELLS: [Position; 15] = [8, 7, 9, 3, 13, 2, 4, 12, 14, 6, 10, 1, 5, 11, 15];

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAi;

impl HeuristicAi {
    pub fn new() -> Self {
        Self
    }

    fn winning_cell(board: &Board, symbol: Symbol) -> Option<Position> {
        board.open_positions().into_iter().find(|&position| {
            apply_move(board, position, symbol)
                .map(|next| matches!(evaluate(&next, position), Outcome::Win { .. }))
                .unwrap_or(false)
        })
    }

    pub fn pick(board: &Board, symbol: Symbol, difficulty: Difficulty) -> Option<Position> {
        let first_open = || board.open_positions().into_iter().next();

        match difficulty {
            Difficulty::Easy => first_open(),
            Difficulty::Medium => Self::winning_cell(board, symbol).or_else(first_open),
            Difficulty::Hard => Self::winning_cell(board, symbol)
                .or_else(|| Self::winning_cell(board, symbol.opponent()))
                .or_else(|| {
                    PREFERRED_CELLS
                        .into_iter()
                        .find(|position| !board.is_occupied(*position))
                }),
        }
    }
}

#[async_trait]
impl MoveProvider for HeuristicAi {
    async fn choose_move(
        &self,
        board: &Board,
        symbol: Symbol,
        difficulty: Difficulty,
    ) -> Option<Position> {
        Self::pick(board, symbol, difficulty)
    }
}
