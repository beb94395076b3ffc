use game_types::{AchievementType, GameResult, UserStatCounters, WinCondition};

pub const WIN_STREAK_SHORT: usize = 5;
pub const WIN_STREAK_LONG: usize = 10;
pub const DIAGONAL_WINS_REQUIRED: u32 = 3;
pub const SPEED_DEMON_WINS: u32 = 20;
pub const VETERAN_GAMES: u32 = 100;
pub const COMEBACK_LOSSES: usize = 5;

/// How many recent games the rules need to see, latest included.
pub const HISTORY_DEPTH: usize = WIN_STREAK_LONG + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub result: GameResult,
    pub win_condition: Option<WinCondition>,
}

/// Everything the achievement rules look at, captured right after the
/// latest game has been counted.
#[derive(Debug, Clone)]
pub struct PlayerHistory {
    pub counters: UserStatCounters,
    /// Most recent first; `recent[0]` is the game just finished.
    pub recent: Vec<HistoryEntry>,
    pub diagonal_wins: u32,
}

impl PlayerHistory {
    fn latest(&self) -> Option<&HistoryEntry> {
        self.recent.first()
    }

    fn latest_is_win(&self) -> bool {
        self.latest().is_some_and(|g| g.result == GameResult::Win)
    }

    fn leading_wins(&self) -> usize {
        self.recent
            .iter()
            .take_while(|g| g.result == GameResult::Win)
            .count()
    }

    fn qualifies(&self, achievement: AchievementType) -> bool {
        match achievement {
            AchievementType::FirstWin => self.latest_is_win() && self.counters.wins >= 1,
            AchievementType::WinStreak5 => self.leading_wins() >= WIN_STREAK_SHORT,
            AchievementType::WinStreak10 => self.leading_wins() >= WIN_STREAK_LONG,
            AchievementType::MasterOfDiagonals => {
                self.latest().is_some_and(|g| {
                    g.result == GameResult::Win && g.win_condition == Some(WinCondition::Diagonal)
                }) && self.diagonal_wins >= DIAGONAL_WINS_REQUIRED
            }
            AchievementType::SpeedDemon => {
                self.latest_is_win() && self.counters.wins >= SPEED_DEMON_WINS
            }
            AchievementType::VeteranPlayer => self.counters.total_games() >= VETERAN_GAMES,
            AchievementType::ComebackKing => self.is_comeback(),
        }
    }

    // A win right after a run of exactly five losses.
    fn is_comeback(&self) -> bool {
        if !self.latest_is_win() {
            return false;
        }
        let losses = self.recent[1..]
            .iter()
            .take_while(|g| g.result == GameResult::Loss)
            .count();
        losses == COMEBACK_LOSSES
    }
}

/// Achievements the history qualifies for that the player does not hold yet.
pub fn new_achievements(
    history: &PlayerHistory,
    already_granted: &[AchievementType],
) -> Vec<AchievementType> {
    AchievementType::ALL
        .iter()
        .copied()
        .filter(|a| !already_granted.contains(a))
        .filter(|a| history.qualifies(*a))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(result: GameResult) -> HistoryEntry {
        HistoryEntry {
            result,
            win_condition: match result {
                GameResult::Win | GameResult::Loss => Some(WinCondition::Horizontal),
                GameResult::Draw => Some(WinCondition::Draw),
            },
        }
    }

    /// Builds a history from oldest to newest, the order games are played.
    fn history_of(played: &[GameResult]) -> PlayerHistory {
        let mut counters = UserStatCounters::zeroed(Uuid::new_v4());
        for result in played {
            counters.record(*result);
        }
        PlayerHistory {
            counters,
            recent: played.iter().rev().take(HISTORY_DEPTH).map(|r| entry(*r)).collect(),
            diagonal_wins: 0,
        }
    }

    #[test]
    fn test_first_win() {
        let history = history_of(&[GameResult::Loss, GameResult::Win]);
        assert_eq!(new_achievements(&history, &[]), vec![AchievementType::FirstWin]);
        assert!(new_achievements(&history, &[AchievementType::FirstWin]).is_empty());
        assert!(new_achievements(&history_of(&[GameResult::Draw]), &[]).is_empty());
    }

    #[test]
    fn test_win_streak_five_granted_once() {
        let mut held = Vec::new();
        let mut played = Vec::new();
        let mut grants = Vec::new();
        for _ in 0..7 {
            played.push(GameResult::Win);
            let fresh = new_achievements(&history_of(&played), &held);
            grants.extend(fresh.iter().copied());
            held.extend(fresh);
        }
        let streak_grants = grants
            .iter()
            .filter(|a| **a == AchievementType::WinStreak5)
            .count();
        assert_eq!(streak_grants, 1);
        assert!(held.contains(&AchievementType::FirstWin));
        assert!(!held.contains(&AchievementType::WinStreak10));
    }

    #[test]
    fn test_streak_broken_by_draw() {
        let mut played = vec![GameResult::Win; 4];
        played.push(GameResult::Draw);
        played.push(GameResult::Win);
        let fresh = new_achievements(&history_of(&played), &[AchievementType::FirstWin]);
        assert!(!fresh.contains(&AchievementType::WinStreak5));
    }

    #[test]
    fn test_long_streak() {
        let played = vec![GameResult::Win; 10];
        let fresh = new_achievements(&history_of(&played), &[]);
        assert!(fresh.contains(&AchievementType::WinStreak10));
        assert!(fresh.contains(&AchievementType::WinStreak5));
    }

    #[test]
    fn test_master_of_diagonals_needs_diagonal_latest_win() {
        let mut history = history_of(&[GameResult::Win, GameResult::Win, GameResult::Win]);
        history.diagonal_wins = 3;
        let held = [AchievementType::FirstWin];
        assert!(new_achievements(&history, &held).is_empty());

        history.recent[0].win_condition = Some(WinCondition::Diagonal);
        assert_eq!(
            new_achievements(&history, &held),
            vec![AchievementType::MasterOfDiagonals]
        );
    }

    #[test]
    fn test_totals_based_rules() {
        let mut played = vec![GameResult::Loss; 80];
        played.extend(vec![GameResult::Draw; 19]);
        played.extend(vec![GameResult::Win; 1]);
        let fresh = new_achievements(&history_of(&played), &[]);
        assert!(fresh.contains(&AchievementType::VeteranPlayer));
        assert!(!fresh.contains(&AchievementType::SpeedDemon));

        // Veteran status does not need a win.
        let fresh = new_achievements(&history_of(&vec![GameResult::Loss; 100]), &[]);
        assert_eq!(fresh, vec![AchievementType::VeteranPlayer]);

        let fresh = new_achievements(&history_of(&vec![GameResult::Win; 20]), &[]);
        assert!(fresh.contains(&AchievementType::SpeedDemon));
    }

    #[test]
    fn test_comeback_requires_exactly_five_losses() {
        let mut played = vec![GameResult::Loss; 5];
        played.push(GameResult::Win);
        let fresh = new_achievements(&history_of(&played), &[AchievementType::FirstWin]);
        assert_eq!(fresh, vec![AchievementType::ComebackKing]);

        let mut played = vec![GameResult::Loss; 6];
        played.push(GameResult::Win);
        assert!(new_achievements(&history_of(&played), &[AchievementType::FirstWin]).is_empty());

        let mut played = vec![GameResult::Loss; 4];
        played.push(GameResult::Win);
        assert!(new_achievements(&history_of(&played), &[AchievementType::FirstWin]).is_empty());
    }
}
