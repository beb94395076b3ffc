//! Board rules for the 3x5 grid.
//!
//! Everything here is pure: the same board and move always produce the same
//! result. Turn order is the session's concern, not the engine's.

use game_types::{
    Board, COLUMNS, GameError, Position, Symbol, WinCondition, column_of, is_valid_position,
    position_at, row_of,
};

/// Cells in a horizontal winning run.
pub const HORIZONTAL_RUN: u8 = 4;

/// The rightmost column only ever scores as part of a horizontal run.
pub const RESTRICTED_COLUMN: u8 = COLUMNS;

/// The only diagonals that score. Column 5 is never part of one.
pub const DIAGONALS: [[Position; 3]; 4] = [[1, 7, 13], [2, 8, 14], [3, 7, 11], [4, 8, 12]];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Win {
        symbol: Symbol,
        condition: WinCondition,
        line: Vec<Position>,
    },
    Draw,
}

impl Outcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Continue)
    }
}

pub fn apply_move(board: &Board, position: Position, symbol: Symbol) -> Result<Board, GameError> {
    if !is_valid_position(position) {
        return Err(GameError::PositionOutOfRange { position });
    }
    if board.is_occupied(position) {
        return Err(GameError::PositionOccupied { position });
    }

    let mut next = board.clone();
    next.place_unchecked(position, symbol);
    Ok(next)
}

/// Outcome after a piece landed on `last_position`. Only the lines through
/// that cell are inspected, in the order horizontal, vertical, diagonal.
pub fn evaluate(board: &Board, last_position: Position) -> Outcome {
    let symbol = match is_valid_position(last_position)
        .then(|| board.get(last_position))
        .flatten()
    {
        Some(symbol) => symbol,
        None => return draw_or_continue(board),
    };

    let candidates = horizontal_windows(last_position)
        .into_iter()
        .map(|line| (WinCondition::Horizontal, line))
        .chain(
            vertical_line(last_position)
                .into_iter()
                .map(|line| (WinCondition::Vertical, line)),
        )
        .chain(
            diagonals_through(last_position)
                .into_iter()
                .map(|line| (WinCondition::Diagonal, line)),
        );

    for (condition, line) in candidates {
        if line.iter().all(|p| board.get(*p) == Some(symbol)) {
            return Outcome::Win {
                symbol,
                condition,
                line,
            };
        }
    }

    draw_or_continue(board)
}

fn draw_or_continue(board: &Board) -> Outcome {
    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::Continue
    }
}

/// Four-cell windows of the position's row that contain it.
pub fn horizontal_windows(position: Position) -> Vec<Vec<Position>> {
    let row = row_of(position);
    let column = column_of(position);
    (1..=COLUMNS - HORIZONTAL_RUN + 1)
        .filter(|start| (*start..start + HORIZONTAL_RUN).contains(&column))
        .map(|start| {
            (start..start + HORIZONTAL_RUN)
                .map(|c| position_at(row, c))
                .collect()
        })
        .collect()
}

/// The scoring column through `position`, or `None` in the restricted column.
pub fn vertical_line(position: Position) -> Option<Vec<Position>> {
    let column = column_of(position);
    (column != RESTRICTED_COLUMN)
        .then(|| (1..=game_types::ROWS).map(|row| position_at(row, column)).collect())
}

pub fn diagonals_through(position: Position) -> Vec<Vec<Position>> {
    DIAGONALS
        .iter()
        .filter(|line| line.contains(&position))
        .map(|line| line.to_vec())
        .collect()
}

/// Every scoring line on the board, horizontal first.
pub fn all_lines() -> Vec<(WinCondition, Vec<Position>)> {
    let mut lines = Vec::new();
    for row in 1..=game_types::ROWS {
        for start in 1..=COLUMNS - HORIZONTAL_RUN + 1 {
            lines.push((
                WinCondition::Horizontal,
                (start..start + HORIZONTAL_RUN)
                    .map(|c| position_at(row, c))
                    .collect(),
            ));
        }
    }
    for column in 1..RESTRICTED_COLUMN {
        if let Some(line) = vertical_line(column) {
            lines.push((WinCondition::Vertical, line));
        }
    }
    for line in DIAGONALS {
        lines.push((WinCondition::Diagonal, line.to_vec()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_types::CELL_COUNT;

    fn board_with(cells: &[(Position, Symbol)]) -> Board {
        let mut board = Board::new();
        for (p, s) in cells {
            board.place_unchecked(*p, *s);
        }
        board
    }

    /// Deterministic pseudo-random boards so occupancy can be checked broadly.
    fn sample_boards() -> Vec<Board> {
        let mut boards = vec![Board::new()];
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..200 {
            let mut board = Board::new();
            for p in 1..=CELL_COUNT {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                match seed % 3 {
                    0 => board.place_unchecked(p, Symbol::X),
                    1 => board.place_unchecked(p, Symbol::O),
                    _ => {}
                }
            }
            boards.push(board);
        }
        boards
    }

    #[test]
    fn test_apply_move_fails_iff_occupied() {
        for board in sample_boards() {
            for p in 1..=CELL_COUNT {
                let result = apply_move(&board, p, Symbol::X);
                if board.is_occupied(p) {
                    assert_eq!(result, Err(GameError::PositionOccupied { position: p }));
                } else {
                    let next = result.unwrap();
                    assert_eq!(next.get(p), Some(Symbol::X));
                    assert_eq!(next.occupied_count(), board.occupied_count() + 1);
                }
            }
        }
    }

    #[test]
    fn test_apply_move_rejects_out_of_range() {
        let board = Board::new();
        assert_eq!(
            apply_move(&board, 0, Symbol::O),
            Err(GameError::PositionOutOfRange { position: 0 })
        );
        assert_eq!(
            apply_move(&board, 16, Symbol::O),
            Err(GameError::PositionOutOfRange { position: 16 })
        );
    }

    #[test]
    fn test_every_horizontal_window_wins() {
        for row in 1..=3u8 {
            for start in 1..=2u8 {
                let line: Vec<Position> = (start..start + 4).map(|c| position_at(row, c)).collect();
                for last in &line {
                    let cells: Vec<_> = line.iter().map(|p| (*p, Symbol::O)).collect();
                    let board = board_with(&cells);
                    match evaluate(&board, *last) {
                        Outcome::Win {
                            symbol,
                            condition,
                            line: won,
                        } => {
                            assert_eq!(symbol, Symbol::O);
                            assert_eq!(condition, WinCondition::Horizontal);
                            assert_eq!(won, line);
                        }
                        other => panic!("expected horizontal win, got {:?}", other),
                    }
                }
            }
        }
    }

    #[test]
    fn test_three_in_a_row_is_not_horizontal_win() {
        let board = board_with(&[(1, Symbol::X), (2, Symbol::X), (3, Symbol::X)]);
        assert_eq!(evaluate(&board, 3), Outcome::Continue);
    }

    #[test]
    fn test_vertical_column_wins() {
        let board = board_with(&[(2, Symbol::X), (7, Symbol::X), (12, Symbol::X)]);
        match evaluate(&board, 7) {
            Outcome::Win { condition, line, .. } => {
                assert_eq!(condition, WinCondition::Vertical);
                assert_eq!(line, vec![2, 7, 12]);
            }
            other => panic!("expected vertical win, got {:?}", other),
        }
    }

    #[test]
    fn test_diagonal_scenario() {
        let board = board_with(&[(1, Symbol::X), (7, Symbol::X), (13, Symbol::X)]);
        match evaluate(&board, 13) {
            Outcome::Win {
                symbol,
                condition,
                line,
            } => {
                assert_eq!(symbol, Symbol::X);
                assert_eq!(condition, WinCondition::Diagonal);
                assert_eq!(line, vec![1, 7, 13]);
            }
            other => panic!("expected diagonal win, got {:?}", other),
        }
    }

    #[test]
    fn test_column_five_only_scores_horizontally() {
        for line in DIAGONALS {
            assert!(line.iter().all(|p| column_of(*p) != RESTRICTED_COLUMN));
        }
        for p in [5, 10, 15] {
            assert!(diagonals_through(p).is_empty());
            assert!(vertical_line(p).is_none());
        }

        let board = board_with(&[(5, Symbol::O), (10, Symbol::O), (15, Symbol::O)]);
        for last in [5, 10, 15] {
            assert_eq!(evaluate(&board, last), Outcome::Continue);
        }

        // The column still counts towards a row.
        let board = board_with(&[(2, Symbol::X), (3, Symbol::X), (4, Symbol::X), (5, Symbol::X)]);
        assert!(matches!(
            evaluate(&board, 5),
            Outcome::Win { condition: WinCondition::Horizontal, .. }
        ));
    }

    #[test]
    fn test_no_diagonal_win_reported_through_column_five() {
        // Anti-diagonal shapes touching column 5 must not score as diagonals.
        let shapes: [[Position; 3]; 4] = [[5, 9, 13], [3, 9, 15], [5, 9, 3], [15, 9, 3]];
        for shape in shapes {
            let cells: Vec<_> = shape.iter().map(|p| (*p, Symbol::O)).collect();
            let board = board_with(&cells);
            for last in shape {
                assert_eq!(evaluate(&board, last), Outcome::Continue);
            }
        }
    }

    #[test]
    fn test_win_and_draw_are_exclusive() {
        // Full board whose last move completes a row: win, not draw.
        let mut cells = Vec::new();
        let layout = [
            Symbol::O, Symbol::X, Symbol::X, Symbol::X, Symbol::X,
            Symbol::X, Symbol::O, Symbol::O, Symbol::X, Symbol::O,
            Symbol::O, Symbol::X, Symbol::X, Symbol::O, Symbol::O,
        ];
        for (i, s) in layout.iter().enumerate() {
            cells.push(((i + 1) as Position, *s));
        }
        let board = board_with(&cells);
        assert!(board.is_full());
        assert!(matches!(
            evaluate(&board, 5),
            Outcome::Win { condition: WinCondition::Horizontal, .. }
        ));
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        let layout = [
            Symbol::X, Symbol::X, Symbol::O, Symbol::O, Symbol::X,
            Symbol::O, Symbol::O, Symbol::X, Symbol::X, Symbol::O,
            Symbol::X, Symbol::X, Symbol::O, Symbol::O, Symbol::X,
        ];
        let mut board = Board::new();
        for (i, s) in layout.iter().enumerate() {
            board.place_unchecked((i + 1) as Position, *s);
        }
        for p in 1..=CELL_COUNT {
            assert_eq!(evaluate(&board, p), Outcome::Draw, "position {}", p);
        }
    }

    #[test]
    fn test_horizontal_takes_precedence_over_diagonal() {
        // 7 completes both 6-9 horizontally and 1-7-13 diagonally.
        let board = board_with(&[
            (6, Symbol::X),
            (7, Symbol::X),
            (8, Symbol::X),
            (9, Symbol::X),
            (1, Symbol::X),
            (13, Symbol::X),
        ]);
        match evaluate(&board, 7) {
            Outcome::Win { condition, line, .. } => {
                assert_eq!(condition, WinCondition::Horizontal);
                assert_eq!(line, vec![6, 7, 8, 9]);
            }
            other => panic!("expected win, got {:?}", other),
        }
    }

    #[test]
    fn test_all_lines_shape() {
        let lines = all_lines();
        assert_eq!(lines.len(), 6 + 4 + 4);
        assert!(lines.iter().all(|(condition, line)| {
            *condition == WinCondition::Horizontal
                || line.iter().all(|p| column_of(*p) != RESTRICTED_COLUMN)
        }));
        for (_, line) in &lines {
            assert!(line.iter().all(|p| is_valid_position(*p)));
        }
    }
}
