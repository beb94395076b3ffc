use std::sync::Arc;

use anyhow::Result;
use game_core::{HISTORY_DEPTH, PlayerHistory, new_achievements};
use game_persistence::{FallbackStatsSource, GameStore};
use game_types::{
    AchievementMetadata, AchievementRecord, GameId, GameResult, OnlineGameStats, PlayerRanking,
    RankingSort, ThemeUnlock, UserId, UserStatCounters, WinCondition,
};
use tracing::info;

/// Records finished games and answers the stats read API.
pub struct StatsService {
    store: Arc<dyn GameStore>,
    reads: FallbackStatsSource,
}

impl StatsService {
    pub fn new(store: Arc<dyn GameStore>, reads: FallbackStatsSource) -> Self {
        Self { store, reads }
    }

    pub async fn apply_counter(&self, user_id: UserId, result: GameResult) -> Result<()> {
        self.store.increment_result(user_id, result).await
    }

    /// Runs the achievement rules against the player's history, which must
    /// already include the finished game. Returns only fresh grants.
    pub async fn evaluate_achievements(
        &self,
        user_id: UserId,
        game_id: GameId,
        result: GameResult,
        win_condition: Option<WinCondition>,
    ) -> Result<Vec<AchievementRecord>> {
        let history = PlayerHistory {
            counters: self.store.get_user_stats(user_id).await?,
            recent: self.store.recent_results(user_id, HISTORY_DEPTH as u64).await?,
            diagonal_wins: self.store.diagonal_wins(user_id).await?,
        };
        let held = self.store.granted_achievements(user_id).await?;

        let mut granted = Vec::new();
        for achievement in new_achievements(&history, &held) {
            let record = AchievementRecord::new(
                user_id,
                achievement,
                chrono::Utc::now().to_rfc3339(),
                AchievementMetadata {
                    game_id: Some(game_id),
                    win_condition,
                    result: Some(result),
                },
            );
            // Theme first: a retry after a failed grant must still unlock it.
            if let Some(theme) = achievement.reward_theme() {
                if self.store.unlock_theme(user_id, theme).await? {
                    info!("User {} unlocked theme {}", user_id, theme.as_str());
                }
            }
            if !self.store.grant_achievement(&record).await? {
                continue;
            }
            info!("User {} unlocked {}", user_id, achievement.as_str());
            granted.push(record);
        }
        Ok(granted)
    }

    pub async fn get_user_stats(&self, user_id: UserId) -> UserStatCounters {
        self.reads.get_user_stats(user_id).await
    }

    pub async fn get_online_game_stats(&self, user_id: UserId) -> OnlineGameStats {
        self.reads.get_online_game_stats(user_id).await
    }

    pub async fn get_player_rankings(&self, sort_by: RankingSort) -> Vec<PlayerRanking> {
        self.reads.get_player_rankings(sort_by).await
    }

    pub async fn get_user_achievements(&self, user_id: UserId) -> Vec<AchievementRecord> {
        self.reads.get_user_achievements(user_id).await
    }

    pub async fn get_user_themes(&self, user_id: UserId) -> Vec<ThemeUnlock> {
        self.reads.get_user_themes(user_id).await
    }
}
