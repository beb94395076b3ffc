use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::StatsSource;
use game_types::{
    AchievementRecord, OnlineGameStats, PlayerRanking, RankingSort, ThemeUnlock, UserId,
    UserStatCounters,
};

/// Read-only export of player statistics, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub users: Vec<UserStatCounters>,
    #[serde(default)]
    pub achievements: Vec<AchievementRecord>,
    #[serde(default)]
    pub themes: Vec<ThemeUnlock>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotStatsSource {
    snapshot: StatsSnapshot,
}

impl SnapshotStatsSource {
    pub fn new(snapshot: StatsSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let snapshot: StatsSnapshot = serde_json::from_str(&contents)?;
        Ok(Self::new(snapshot))
    }

    /// A missing or malformed file yields an empty snapshot.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Stats snapshot {} unavailable: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[async_trait]
impl StatsSource for SnapshotStatsSource {
    async fn get_user_stats(&self, user_id: UserId) -> Result<UserStatCounters> {
        Ok(self
            .snapshot
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .copied()
            .unwrap_or_else(|| UserStatCounters::zeroed(user_id)))
    }

    // The snapshot has no per-game rows to split by mode.
    async fn get_online_game_stats(&self, _user_id: UserId) -> Result<OnlineGameStats> {
        Ok(OnlineGameStats::default())
    }

    async fn get_player_rankings(&self, _sort_by: RankingSort) -> Result<Vec<PlayerRanking>> {
        Ok(Vec::new())
    }

    async fn get_user_achievements(&self, user_id: UserId) -> Result<Vec<AchievementRecord>> {
        Ok(self
            .snapshot
            .achievements
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_user_themes(&self, user_id: UserId) -> Result<Vec<ThemeUnlock>> {
        Ok(self
            .snapshot
            .themes
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Primary store first, then the snapshot, then zeroed defaults. Reads
/// through here never fail.
#[derive(Clone)]
pub struct FallbackStatsSource {
    primary: Arc<dyn StatsSource>,
    secondary: Arc<dyn StatsSource>,
}

impl FallbackStatsSource {
    pub fn new(primary: Arc<dyn StatsSource>, secondary: Arc<dyn StatsSource>) -> Self {
        Self { primary, secondary }
    }

    pub async fn get_user_stats(&self, user_id: UserId) -> UserStatCounters {
        match self.primary.get_user_stats(user_id).await {
            Ok(stats) => return stats,
            Err(e) => warn!("Primary stats read failed for {}: {}", user_id, e),
        }
        self.secondary
            .get_user_stats(user_id)
            .await
            .unwrap_or_else(|e| {
                warn!("Snapshot stats read failed for {}: {}", user_id, e);
                UserStatCounters::zeroed(user_id)
            })
    }

    pub async fn get_online_game_stats(&self, user_id: UserId) -> OnlineGameStats {
        match self.primary.get_online_game_stats(user_id).await {
            Ok(stats) => return stats,
            Err(e) => warn!("Primary online stats read failed for {}: {}", user_id, e),
        }
        self.secondary
            .get_online_game_stats(user_id)
            .await
            .unwrap_or_default()
    }

    pub async fn get_player_rankings(&self, sort_by: RankingSort) -> Vec<PlayerRanking> {
        match self.primary.get_player_rankings(sort_by).await {
            Ok(rankings) => return rankings,
            Err(e) => warn!("Primary rankings read failed: {}", e),
        }
        self.secondary
            .get_player_rankings(sort_by)
            .await
            .unwrap_or_default()
    }

    pub async fn get_user_achievements(&self, user_id: UserId) -> Vec<AchievementRecord> {
        match self.primary.get_user_achievements(user_id).await {
            Ok(records) => return records,
            Err(e) => warn!("Primary achievements read failed for {}: {}", user_id, e),
        }
        self.secondary
            .get_user_achievements(user_id)
            .await
            .unwrap_or_default()
    }

    pub async fn get_user_themes(&self, user_id: UserId) -> Vec<ThemeUnlock> {
        match self.primary.get_user_themes(user_id).await {
            Ok(themes) => return themes,
            Err(e) => warn!("Primary themes read failed for {}: {}", user_id, e),
        }
        self.secondary
            .get_user_themes(user_id)
            .await
            .unwrap_or_default()
    }
}
