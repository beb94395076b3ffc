use anyhow::Result;
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use super::{format_timestamp, parse_timestamp};
use crate::entities::{games, moves, prelude::*};
use game_core::HistoryEntry;
use game_types::{
    Board, GameId, GameMode, GameResult, GameSession, GameStatus, Move, OnlineGameStats,
    RoomId, UserId, WinCondition,
};

pub struct GameRepository {
    db: DatabaseConnection,
}

impl GameRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_session(model: games::Model) -> Result<GameSession> {
        let board: Board = serde_json::from_str(&model.board)?;
        let win_condition = model
            .win_condition
            .as_deref()
            .map(str::parse::<WinCondition>)
            .transpose()
            .map_err(anyhow::Error::msg)?;

        Ok(GameSession {
            id: model.id,
            room_id: model.room_id,
            player_x_id: model.player_x_id,
            player_o_id: model.player_o_id,
            mode: model.game_mode.parse().map_err(anyhow::Error::msg)?,
            current_player: model.current_player.parse().map_err(anyhow::Error::msg)?,
            status: model.status.parse().map_err(anyhow::Error::msg)?,
            board,
            winner_id: model.winner_id,
            win_condition,
            created_at: format_timestamp(&model.created_at),
            finished_at: model.finished_at.as_ref().map(format_timestamp),
            move_count: model.move_count.max(0) as u32,
            degraded: false,
        })
    }

    fn model_to_move(model: moves::Model) -> Result<Move> {
        Ok(Move {
            game_id: model.game_id,
            player_id: model.player_id,
            position: model.position.clamp(0, u8::MAX as i32) as u8,
            symbol: model.symbol.parse().map_err(anyhow::Error::msg)?,
            move_number: model.move_number.max(0) as u32,
            timestamp: format_timestamp(&model.created_at),
        })
    }

    /// Inserts or overwrites the game row with the in-memory state.
    pub async fn save_game(&self, game: &GameSession) -> Result<()> {
        let row = games::ActiveModel {
            id: Set(game.id),
            room_id: Set(game.room_id),
            player_x_id: Set(game.player_x_id),
            player_o_id: Set(game.player_o_id),
            game_mode: Set(game.mode.as_str().to_string()),
            current_player: Set(game.current_player.as_str().to_string()),
            status: Set(game.status.as_str().to_string()),
            board: Set(serde_json::to_string(&game.board)?),
            winner_id: Set(game.winner_id),
            win_condition: Set(game.win_condition.map(|c| c.as_str().to_string())),
            move_count: Set(game.move_count as i32),
            created_at: Set(parse_timestamp(&game.created_at)),
            finished_at: Set(game.finished_at.as_deref().map(parse_timestamp)),
        };

        Games::insert(row)
            .on_conflict(
                OnConflict::column(games::Column::Id)
                    .update_columns([
                        games::Column::CurrentPlayer,
                        games::Column::Status,
                        games::Column::Board,
                        games::Column::WinnerId,
                        games::Column::WinCondition,
                        games::Column::MoveCount,
                        games::Column::FinishedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Idempotent on `(game_id, move_number)`; returns whether a row was written.
    pub async fn append_move(&self, record: &Move) -> Result<bool> {
        let row = moves::ActiveModel {
            game_id: Set(record.game_id),
            player_id: Set(record.player_id),
            position: Set(record.position as i32),
            symbol: Set(record.symbol.as_str().to_string()),
            move_number: Set(record.move_number as i32),
            created_at: Set(parse_timestamp(&record.timestamp)),
            ..Default::default()
        };

        let inserted = Moves::insert(row)
            .on_conflict(
                OnConflict::columns([moves::Column::GameId, moves::Column::MoveNumber])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted > 0)
    }

    pub async fn find_game(&self, id: GameId) -> Result<Option<GameSession>> {
        Games::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Self::model_to_session)
            .transpose()
    }

    pub async fn find_active_by_room(&self, room_id: RoomId) -> Result<Option<GameSession>> {
        Games::find()
            .filter(games::Column::RoomId.eq(room_id))
            .filter(games::Column::Status.eq(GameStatus::Active.as_str()))
            .one(&self.db)
            .await?
            .map(Self::model_to_session)
            .transpose()
    }

    pub async fn moves_for(&self, game_id: GameId) -> Result<Vec<Move>> {
        Moves::find()
            .filter(moves::Column::GameId.eq(game_id))
            .order_by_asc(moves::Column::MoveNumber)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Self::model_to_move)
            .collect()
    }

    fn involving(user_id: UserId) -> Condition {
        Condition::any()
            .add(games::Column::PlayerXId.eq(user_id))
            .add(games::Column::PlayerOId.eq(user_id))
    }

    fn result_for(model: &games::Model, user_id: UserId) -> GameResult {
        match model.winner_id {
            None => GameResult::Draw,
            Some(winner) if winner == user_id => GameResult::Win,
            Some(_) => GameResult::Loss,
        }
    }

    /// Finished, scored games for the user, most recent first. Pass-play
    /// games never count; `online_only` narrows further to matchmade play.
    pub async fn recent_results(
        &self,
        user_id: UserId,
        limit: u64,
        online_only: bool,
    ) -> Result<Vec<HistoryEntry>> {
        let mut query = Games::find()
            .filter(Self::involving(user_id))
            .filter(games::Column::Status.eq(GameStatus::Finished.as_str()))
            .filter(games::Column::GameMode.ne(GameMode::PassPlay.as_str()));
        if online_only {
            query = query.filter(games::Column::GameMode.eq(GameMode::Online.as_str()));
        }

        let models = query
            .order_by_desc(games::Column::FinishedAt)
            .order_by_desc(games::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(models
            .iter()
            .map(|m| HistoryEntry {
                result: Self::result_for(m, user_id),
                win_condition: m.win_condition.as_deref().and_then(|c| c.parse().ok()),
            })
            .collect())
    }

    pub async fn diagonal_wins(&self, user_id: UserId) -> Result<u32> {
        let count = Games::find()
            .filter(games::Column::WinnerId.eq(user_id))
            .filter(games::Column::WinCondition.eq(WinCondition::Diagonal.as_str()))
            .filter(games::Column::GameMode.ne(GameMode::PassPlay.as_str()))
            .count(&self.db)
            .await?;
        Ok(count as u32)
    }

    /// Tallies finished online games straight from the game rows.
    pub async fn online_stats(&self, user_id: UserId) -> Result<OnlineGameStats> {
        let models = Games::find()
            .filter(Self::involving(user_id))
            .filter(games::Column::Status.eq(GameStatus::Finished.as_str()))
            .filter(games::Column::GameMode.eq(GameMode::Online.as_str()))
            .all(&self.db)
            .await?;

        let mut stats = OnlineGameStats::default();
        for model in &models {
            match Self::result_for(model, user_id) {
                GameResult::Win => stats.wins += 1,
                GameResult::Loss => stats.losses += 1,
                GameResult::Draw => stats.draws += 1,
            }
        }
        stats.total_games = stats.wins + stats.losses + stats.draws;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use game_types::{Symbol, AI_PLAYER_ID};
    use migration::{Migrator, MigratorTrait};
    use uuid::Uuid;

    async fn setup_test_db() -> GameRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        GameRepository::new(db)
    }

    fn session(x: UserId, o: UserId, mode: GameMode) -> GameSession {
        GameSession {
            id: Uuid::new_v4(),
            room_id: None,
            player_x_id: x,
            player_o_id: o,
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
        }
    }

    fn finished(mut game: GameSession, winner: Option<UserId>, condition: WinCondition) -> GameSession {
        game.status = GameStatus::Finished;
        game.winner_id = winner;
        game.win_condition = Some(condition);
        game.finished_at = Some(chrono::Utc::now().to_rfc3339());
        game
    }

    #[tokio::test]
    async fn test_save_and_reload_game_with_moves() {
        let repo = setup_test_db().await;
        let mut game = session(Uuid::new_v4(), Uuid::new_v4(), GameMode::Online);
        repo.save_game(&game).await.unwrap();

        let record = Move {
            game_id: game.id,
            player_id: game.player_x_id,
            position: 7,
            symbol: Symbol::X,
            move_number: 1,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        assert!(repo.append_move(&record).await.unwrap());
        // Replaying the same move is ignored.
        assert!(!repo.append_move(&record).await.unwrap());

        game.board.place_unchecked(7, Symbol::X);
        game.move_count = 1;
        game.current_player = Symbol::O;
        repo.save_game(&game).await.unwrap();

        let loaded = repo.find_game(game.id).await.unwrap().unwrap();
        assert_eq!(loaded.board.get(7), Some(Symbol::X));
        assert_eq!(loaded.current_player, Symbol::O);
        assert_eq!(loaded.move_count, 1);

        let moves = repo.moves_for(game.id).await.unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].position, 7);
    }

    #[tokio::test]
    async fn test_history_and_online_stats() {
        let repo = setup_test_db().await;
        let me = Uuid::new_v4();
        let rival = Uuid::new_v4();

        let online_win = finished(session(me, rival, GameMode::Online), Some(me), WinCondition::Diagonal);
        repo.save_game(&online_win).await.unwrap();
        let online_draw = finished(session(rival, me, GameMode::Online), None, WinCondition::Draw);
        repo.save_game(&online_draw).await.unwrap();
        let ai_loss = finished(session(me, AI_PLAYER_ID, GameMode::Ai), Some(AI_PLAYER_ID), WinCondition::Vertical);
        repo.save_game(&ai_loss).await.unwrap();
        let pass_play = finished(session(me, me, GameMode::PassPlay), Some(me), WinCondition::Diagonal);
        repo.save_game(&pass_play).await.unwrap();
        repo.save_game(&session(me, rival, GameMode::Online)).await.unwrap();

        let history = repo.recent_results(me, 10, false).await.unwrap();
        let results: Vec<GameResult> = history.iter().map(|h| h.result).collect();
        assert_eq!(results, vec![GameResult::Loss, GameResult::Draw, GameResult::Win]);

        let online = repo.recent_results(me, 10, true).await.unwrap();
        assert_eq!(online.len(), 2);

        assert_eq!(repo.diagonal_wins(me).await.unwrap(), 1);

        let stats = repo.online_stats(me).await.unwrap();
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.losses, 0);
        assert_eq!(stats.total_games, 2);
    }
}
