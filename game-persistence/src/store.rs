use anyhow::Result;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::repositories::{
    AchievementRepository, BlockRepository, GameRepository, RoomRepository, UserRepository,
};
use game_core::{HistoryEntry, RankingInput, STREAK_WINDOW, rank_players};
use game_types::{
    AchievementRecord, AchievementType, BlockedUser, GameId, GameResult, GameSession, Move,
    OnlineGameStats, PlayerRanking, RankingSort, Room, RoomId, Theme, ThemeUnlock, UserId,
    UserProfile, UserStatCounters,
};

/// Read side of player statistics. Implemented by the database store and
/// by the read-only snapshot used when the database is unreachable.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn get_user_stats(&self, user_id: UserId) -> Result<UserStatCounters>;
    async fn get_online_game_stats(&self, user_id: UserId) -> Result<OnlineGameStats>;
    async fn get_player_rankings(&self, sort_by: RankingSort) -> Result<Vec<PlayerRanking>>;
    async fn get_user_achievements(&self, user_id: UserId) -> Result<Vec<AchievementRecord>>;
    async fn get_user_themes(&self, user_id: UserId) -> Result<Vec<ThemeUnlock>>;
}

/// Lookup of identity details for users this service already knows.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>>;
}

/// Everything the game server persists.
#[async_trait]
pub trait GameStore: StatsSource + IdentityProvider {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()>;

    async fn save_room(&self, room: &Room) -> Result<()>;
    async fn get_room_by_code(&self, code: &str) -> Result<Option<Room>>;
    async fn get_active_game_by_room(&self, room_id: RoomId) -> Result<Option<GameSession>>;

    async fn save_game(&self, game: &GameSession) -> Result<()>;
    /// Returns `false` when the move was already stored.
    async fn append_move(&self, record: &Move) -> Result<bool>;
    async fn get_game(&self, game_id: GameId) -> Result<Option<GameSession>>;
    async fn get_game_moves(&self, game_id: GameId) -> Result<Vec<Move>>;

    async fn increment_result(&self, user_id: UserId, result: GameResult) -> Result<()>;
    /// Most recent first, pass-play excluded.
    async fn recent_results(&self, user_id: UserId, limit: u64) -> Result<Vec<HistoryEntry>>;
    async fn diagonal_wins(&self, user_id: UserId) -> Result<u32>;
    async fn granted_achievements(&self, user_id: UserId) -> Result<Vec<AchievementType>>;
    /// Returns `false` when the achievement was already held.
    async fn grant_achievement(&self, record: &AchievementRecord) -> Result<bool>;
    async fn unlock_theme(&self, user_id: UserId, theme: Theme) -> Result<bool>;

    /// Returns `false` when the block already existed.
    async fn block_user(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool>;
    /// Returns `false` when there was no block to lift.
    async fn unblock_user(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool>;
    /// Blocks placed by the user, newest first.
    async fn blocked_users(&self, blocker_id: UserId) -> Result<Vec<BlockedUser>>;
}

pub struct SeaOrmStore {
    users: UserRepository,
    rooms: RoomRepository,
    games: GameRepository,
    achievements: AchievementRepository,
    blocks: BlockRepository,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            rooms: RoomRepository::new(db.clone()),
            games: GameRepository::new(db.clone()),
            achievements: AchievementRepository::new(db.clone()),
            blocks: BlockRepository::new(db),
        }
    }
}

#[async_trait]
impl StatsSource for SeaOrmStore {
    async fn get_user_stats(&self, user_id: UserId) -> Result<UserStatCounters> {
        self.users.get_counters(user_id).await
    }

    async fn get_online_game_stats(&self, user_id: UserId) -> Result<OnlineGameStats> {
        self.games.online_stats(user_id).await
    }

    async fn get_player_rankings(&self, sort_by: RankingSort) -> Result<Vec<PlayerRanking>> {
        let ranked = self.users.find_ranked().await?;
        let mut inputs = Vec::with_capacity(ranked.len());
        for (profile, counters) in ranked {
            let recent_online = self
                .games
                .recent_results(profile.id, STREAK_WINDOW as u64, true)
                .await?
                .into_iter()
                .map(|entry| entry.result)
                .collect();
            inputs.push(RankingInput {
                user_id: profile.id,
                display_name: profile.resolved_display_name(),
                counters,
                recent_online,
            });
        }
        debug!("Ranking {} players", inputs.len());
        Ok(rank_players(inputs, sort_by))
    }

    async fn get_user_achievements(&self, user_id: UserId) -> Result<Vec<AchievementRecord>> {
        self.achievements.list_for_user(user_id).await
    }

    async fn get_user_themes(&self, user_id: UserId) -> Result<Vec<ThemeUnlock>> {
        self.achievements.themes_for_user(user_id).await
    }
}

#[async_trait]
impl IdentityProvider for SeaOrmStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        self.users.find_by_id(user_id).await
    }
}

#[async_trait]
impl GameStore for SeaOrmStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        self.users.upsert_profile(profile).await
    }

    async fn save_room(&self, room: &Room) -> Result<()> {
        self.rooms.save(room).await
    }

    async fn get_room_by_code(&self, code: &str) -> Result<Option<Room>> {
        self.rooms.find_by_code(code).await
    }

    async fn get_active_game_by_room(&self, room_id: RoomId) -> Result<Option<GameSession>> {
        self.games.find_active_by_room(room_id).await
    }

    async fn save_game(&self, game: &GameSession) -> Result<()> {
        self.games.save_game(game).await
    }

    async fn append_move(&self, record: &Move) -> Result<bool> {
        self.games.append_move(record).await
    }

    async fn get_game(&self, game_id: GameId) -> Result<Option<GameSession>> {
        self.games.find_game(game_id).await
    }

    async fn get_game_moves(&self, game_id: GameId) -> Result<Vec<Move>> {
        self.games.moves_for(game_id).await
    }

    async fn increment_result(&self, user_id: UserId, result: GameResult) -> Result<()> {
        self.users.increment_result(user_id, result).await
    }

    async fn recent_results(&self, user_id: UserId, limit: u64) -> Result<Vec<HistoryEntry>> {
        self.games.recent_results(user_id, limit, false).await
    }

    async fn diagonal_wins(&self, user_id: UserId) -> Result<u32> {
        self.games.diagonal_wins(user_id).await
    }

    async fn granted_achievements(&self, user_id: UserId) -> Result<Vec<AchievementType>> {
        self.achievements.granted_types(user_id).await
    }

    async fn grant_achievement(&self, record: &AchievementRecord) -> Result<bool> {
        self.achievements.grant(record).await
    }

    async fn unlock_theme(&self, user_id: UserId, theme: Theme) -> Result<bool> {
        self.achievements.unlock_theme(user_id, theme).await
    }

    async fn block_user(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool> {
        self.blocks.block(blocker_id, blocked_id).await
    }

    async fn unblock_user(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool> {
        self.blocks.unblock(blocker_id, blocked_id).await
    }

    async fn blocked_users(&self, blocker_id: UserId) -> Result<Vec<BlockedUser>> {
        self.blocks.list_for(blocker_id).await
    }
}
