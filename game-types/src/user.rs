use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameId, GameResult, UserId, WinCondition};

/// Identity record handed to us by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: Some(display_name.into()),
            username: None,
            email: None,
        }
    }

    /// Name shown to other players: display name, then username, then a
    /// short id-derived label. Blank values are skipped.
    pub fn resolved_display_name(&self) -> String {
        resolve_display_name(self.id, self.display_name.as_deref(), self.username.as_deref())
    }
}

pub fn resolve_display_name(id: UserId, display_name: Option<&str>, username: Option<&str>) -> String {
    [display_name, username]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Player {}", &id.simple().to_string()[..8]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserStatCounters {
    pub user_id: UserId,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl UserStatCounters {
    pub fn zeroed(user_id: UserId) -> Self {
        Self {
            user_id,
            wins: 0,
            losses: 0,
            draws: 0,
        }
    }

    pub fn total_games(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    /// Percentage in 0..=100.
    pub fn win_rate(&self) -> f64 {
        match self.total_games() {
            0 => 0.0,
            total => self.wins as f64 / total as f64 * 100.0,
        }
    }

    pub fn record(&mut self, result: GameResult) {
        match result {
            GameResult::Win => self.wins += 1,
            GameResult::Loss => self.losses += 1,
            GameResult::Draw => self.draws += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OnlineGameStats {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_games: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum RankingSort {
    Wins,
    #[serde(alias = "total_games")]
    TotalGames,
    #[default]
    #[serde(alias = "win_rate")]
    WinRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerRanking {
    pub rank: u32,
    pub user_id: UserId,
    pub display_name: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_games: u32,
    pub win_rate: f64,
    pub streak: u32,
    pub streak_type: GameResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum AchievementType {
    #[serde(rename = "first_win")]
    FirstWin,
    #[serde(rename = "win_streak_5")]
    WinStreak5,
    #[serde(rename = "win_streak_10")]
    WinStreak10,
    #[serde(rename = "master_of_diagonals")]
    MasterOfDiagonals,
    #[serde(rename = "speed_demon")]
    SpeedDemon,
    #[serde(rename = "veteran_player")]
    VeteranPlayer,
    #[serde(rename = "comeback_king")]
    ComebackKing,
}

impl AchievementType {
    pub const ALL: [AchievementType; 7] = [
        AchievementType::FirstWin,
        AchievementType::WinStreak5,
        AchievementType::WinStreak10,
        AchievementType::MasterOfDiagonals,
        AchievementType::SpeedDemon,
        AchievementType::VeteranPlayer,
        AchievementType::ComebackKing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AchievementType::FirstWin => "first_win",
            AchievementType::WinStreak5 => "win_streak_5",
            AchievementType::WinStreak10 => "win_streak_10",
            AchievementType::MasterOfDiagonals => "master_of_diagonals",
            AchievementType::SpeedDemon => "speed_demon",
            AchievementType::VeteranPlayer => "veteran_player",
            AchievementType::ComebackKing => "comeback_king",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AchievementType::FirstWin => "First Victory",
            AchievementType::WinStreak5 => "Win Streak Master",
            AchievementType::WinStreak10 => "Unstoppable",
            AchievementType::MasterOfDiagonals => "Master of Diagonals",
            AchievementType::SpeedDemon => "Speed Demon",
            AchievementType::VeteranPlayer => "Veteran Player",
            AchievementType::ComebackKing => "Comeback King",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AchievementType::FirstWin => "Win your first game",
            AchievementType::WinStreak5 => "Win 5 games in a row",
            AchievementType::WinStreak10 => "Win 10 games in a row",
            AchievementType::MasterOfDiagonals => "Win 3 games with diagonal victories",
            AchievementType::SpeedDemon => "Win 20 games total",
            AchievementType::VeteranPlayer => "Play 100 games total",
            AchievementType::ComebackKing => "Win after losing 5 games in a row",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            AchievementType::FirstWin => "🏆",
            AchievementType::WinStreak5 => "🔥",
            AchievementType::WinStreak10 => "⚡",
            AchievementType::MasterOfDiagonals => "🎯",
            AchievementType::SpeedDemon => "⚡",
            AchievementType::VeteranPlayer => "🎖️",
            AchievementType::ComebackKing => "👑",
        }
    }

    /// Cosmetic theme unlocked alongside the achievement, if any.
    pub fn reward_theme(self) -> Option<Theme> {
        match self {
            AchievementType::WinStreak10 => Some(Theme::Halloween),
            AchievementType::SpeedDemon => Some(Theme::Christmas),
            AchievementType::VeteranPlayer => Some(Theme::Summer),
            _ => None,
        }
    }
}

impl FromStr for AchievementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown achievement type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Theme {
    Halloween,
    Christmas,
    Summer,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Halloween => "halloween",
            Theme::Christmas => "christmas",
            Theme::Summer => "summer",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "halloween" => Ok(Theme::Halloween),
            "christmas" => Ok(Theme::Christmas),
            "summer" => Ok(Theme::Summer),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

/// Context captured when an achievement is granted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AchievementMetadata {
    pub game_id: Option<GameId>,
    pub win_condition: Option<WinCondition>,
    pub result: Option<GameResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AchievementRecord {
    pub user_id: UserId,
    pub achievement_type: AchievementType,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub unlocked_at: String, // ISO 8601 string
    pub metadata: AchievementMetadata,
}

impl AchievementRecord {
    pub fn new(
        user_id: UserId,
        achievement_type: AchievementType,
        unlocked_at: String,
        metadata: AchievementMetadata,
    ) -> Self {
        Self {
            user_id,
            achievement_type,
            name: achievement_type.display_name().to_string(),
            description: achievement_type.description().to_string(),
            icon: achievement_type.icon().to_string(),
            unlocked_at,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ThemeUnlock {
    pub user_id: UserId,
    pub theme: Theme,
    pub unlocked_at: String,
}

/// One user's refusal to meet another in rooms, chat or matchmaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BlockedUser {
    pub blocker_id: UserId,
    pub blocked_id: UserId,
    pub blocked_at: String,
}
