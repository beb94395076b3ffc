use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameId, RoomId, UserId};

/// Board cell index, 1-based, row-major over 3 rows of 5 columns.
pub type Position = u8;

pub const ROWS: u8 = 3;
pub const COLUMNS: u8 = 5;
pub const CELL_COUNT: u8 = ROWS * COLUMNS;

/// Row (1..=3) of a valid position.
pub fn row_of(position: Position) -> u8 {
    (position - 1) / COLUMNS + 1
}

/// Column (1..=5) of a valid position.
pub fn column_of(position: Position) -> u8 {
    (position - 1) % COLUMNS + 1
}

pub fn position_at(row: u8, column: u8) -> Position {
    (row - 1) * COLUMNS + column
}

pub fn is_valid_position(position: Position) -> bool {
    (1..=CELL_COUNT).contains(&position)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::X => "X",
            Symbol::O => "O",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Symbol::X),
            "O" => Ok(Symbol::O),
            other => Err(format!("unknown symbol '{}'", other)),
        }
    }
}

/// Occupied cells only; an empty position has no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Board {
    cells: BTreeMap<Position, Symbol>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, position: Position) -> Option<Symbol> {
        self.cells.get(&position).copied()
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.cells.contains_key(&position)
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_full(&self) -> bool {
        self.cells.len() == CELL_COUNT as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, Symbol)> + '_ {
        self.cells.iter().map(|(p, s)| (*p, *s))
    }

    pub fn open_positions(&self) -> Vec<Position> {
        (1..=CELL_COUNT).filter(|p| !self.is_occupied(*p)).collect()
    }

    /// Writes a cell without any rule checks. Game code goes through
    /// `game_core::rules::apply_move` instead.
    pub fn place_unchecked(&mut self, position: Position, symbol: Symbol) {
        self.cells.insert(position, symbol);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum GameMode {
    Ai,
    PassPlay,
    Online,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Ai => "ai",
            GameMode::PassPlay => "pass-play",
            GameMode::Online => "online",
        }
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(GameMode::Ai),
            "pass-play" => Ok(GameMode::PassPlay),
            "online" => Ok(GameMode::Online),
            other => Err(format!("unknown game mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum GameStatus {
    Active,
    Finished,
    Abandoned,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
            GameStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Active)
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GameStatus::Active),
            "finished" => Ok(GameStatus::Finished),
            "abandoned" => Ok(GameStatus::Abandoned),
            other => Err(format!("unknown game status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WinCondition {
    Horizontal,
    Vertical,
    Diagonal,
    Draw,
}

impl WinCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            WinCondition::Horizontal => "horizontal",
            WinCondition::Vertical => "vertical",
            WinCondition::Diagonal => "diagonal",
            WinCondition::Draw => "draw",
        }
    }
}

impl FromStr for WinCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(WinCondition::Horizontal),
            "vertical" => Ok(WinCondition::Vertical),
            "diagonal" => Ok(WinCondition::Diagonal),
            "draw" => Ok(WinCondition::Draw),
            other => Err(format!("unknown win condition '{}'", other)),
        }
    }
}

/// A finished game seen from one player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameSession {
    pub id: GameId,
    /// `None` for the local-only modes, which never construct a room.
    pub room_id: Option<RoomId>,
    pub player_x_id: UserId,
    pub player_o_id: UserId,
    pub mode: GameMode,
    pub current_player: Symbol,
    pub status: GameStatus,
    pub board: Board,
    pub winner_id: Option<UserId>,
    pub win_condition: Option<WinCondition>,
    pub created_at: String, // ISO 8601 string
    pub finished_at: Option<String>,
    pub move_count: u32,
    /// Set while some state of this game has not reached the store yet.
    pub degraded: bool,
}

impl GameSession {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.player_x_id == user_id || self.player_o_id == user_id
    }

    pub fn player_for(&self, symbol: Symbol) -> UserId {
        match symbol {
            Symbol::X => self.player_x_id,
            Symbol::O => self.player_o_id,
        }
    }

    /// Symbol the given user plays. In pass-play both seats share one user,
    /// who always moves as the current player.
    pub fn symbol_of(&self, user_id: UserId) -> Option<Symbol> {
        if self.player_x_id == user_id && self.player_o_id == user_id {
            Some(self.current_player)
        } else if self.player_x_id == user_id {
            Some(Symbol::X)
        } else if self.player_o_id == user_id {
            Some(Symbol::O)
        } else {
            None
        }
    }

    /// Result for one participant of a finished game.
    pub fn result_for(&self, user_id: UserId) -> Option<GameResult> {
        if self.status != GameStatus::Finished || !self.is_participant(user_id) {
            return None;
        }
        Some(match self.winner_id {
            None => GameResult::Draw,
            Some(winner) if winner == user_id => GameResult::Win,
            Some(_) => GameResult::Loss,
        })
    }
}

/// Append-only move record. `move_number` is the ordering authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Move {
    pub game_id: GameId,
    pub player_id: UserId,
    pub position: Position,
    pub symbol: Symbol,
    pub move_number: u32,
    pub timestamp: String, // ISO 8601 string
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_grid_coordinates() {
        assert_eq!((row_of(1), column_of(1)), (1, 1));
        assert_eq!((row_of(5), column_of(5)), (1, 5));
        assert_eq!((row_of(6), column_of(6)), (2, 1));
        assert_eq!((row_of(13), column_of(13)), (3, 3));
        assert_eq!((row_of(15), column_of(15)), (3, 5));
        assert_eq!(position_at(2, 3), 8);
        assert!(!is_valid_position(0));
        assert!(!is_valid_position(16));
    }

    #[test]
    fn test_board_open_positions() {
        let mut board = Board::new();
        board.place_unchecked(1, Symbol::X);
        board.place_unchecked(15, Symbol::O);
        let open = board.open_positions();
        assert_eq!(open.len(), 13);
        assert!(!open.contains(&1));
        assert!(!open.contains(&15));
        assert_eq!(board.occupied_count(), 2);
    }

    #[test]
    fn test_pass_play_symbol_follows_turn() {
        let user = Uuid::new_v4();
        let mut session = GameSession {
            id: Uuid::new_v4(),
            room_id: None,
            player_x_id: user,
            player_o_id: user,
            mode: GameMode::PassPlay,
            current_player: Symbol::O,
            status: GameStatus::Active,
            board: Board::new(),
            winner_id: None,
            win_condition: None,
            created_at: String::new(),
            finished_at: None,
            move_count: 1,
            degraded: false,
        };
        assert_eq!(session.symbol_of(user), Some(Symbol::O));
        session.current_player = Symbol::X;
        assert_eq!(session.symbol_of(user), Some(Symbol::X));
        assert_eq!(session.symbol_of(Uuid::new_v4()), None);
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(serde_json::to_string(&GameMode::PassPlay).unwrap(), "\"pass-play\"");
        assert_eq!("pass-play".parse::<GameMode>().unwrap(), GameMode::PassPlay);
        assert_eq!(serde_json::to_string(&WinCondition::Diagonal).unwrap(), "\"diagonal\"");
    }
}
