use std::cmp::Ordering;

use game_types::{GameResult, PlayerRanking, RankingSort, UserId, UserStatCounters};

/// Recent online games inspected when computing a streak.
pub const STREAK_WINDOW: usize = 10;

#[derive(Debug, Clone)]
pub struct RankingInput {
    pub user_id: UserId,
    pub display_name: String,
    pub counters: UserStatCounters,
    /// Finished online games, most recent first.
    pub recent_online: Vec<GameResult>,
}

/// Length and kind of the run the latest game belongs to. With no games
/// the streak is zero wins.
pub fn current_streak(recent: &[GameResult]) -> (u32, GameResult) {
    let Some(&latest) = recent.first() else {
        return (0, GameResult::Win);
    };
    let run = recent
        .iter()
        .take(STREAK_WINDOW)
        .take_while(|r| **r == latest)
        .count();
    (run as u32, latest)
}

fn compare(a: &PlayerRanking, b: &PlayerRanking, sort: RankingSort) -> Ordering {
    let by_rate = b.win_rate.total_cmp(&a.win_rate);
    match sort {
        RankingSort::Wins => b.wins.cmp(&a.wins).then(by_rate),
        RankingSort::TotalGames => b.total_games.cmp(&a.total_games).then(by_rate),
        RankingSort::WinRate => by_rate
            .then(b.total_games.cmp(&a.total_games))
            .then(b.wins.cmp(&a.wins)),
    }
}

/// Players with at least one game, ordered and numbered from 1.
pub fn rank_players(inputs: Vec<RankingInput>, sort: RankingSort) -> Vec<PlayerRanking> {
    let mut rankings: Vec<PlayerRanking> = inputs
        .into_iter()
        .filter(|input| input.counters.total_games() > 0)
        .map(|input| {
            let (streak, streak_type) = current_streak(&input.recent_online);
            PlayerRanking {
                rank: 0,
                user_id: input.user_id,
                display_name: input.display_name,
                wins: input.counters.wins,
                losses: input.counters.losses,
                draws: input.counters.draws,
                total_games: input.counters.total_games(),
                win_rate: input.counters.win_rate(),
                streak,
                streak_type,
            }
        })
        .collect();

    rankings.sort_by(|a, b| compare(a, b, sort));
    for (index, ranking) in rankings.iter_mut().enumerate() {
        ranking.rank = index as u32 + 1;
    }
    rankings
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn input(name: &str, wins: u32, losses: u32, draws: u32) -> RankingInput {
        let user_id = Uuid::new_v4();
        RankingInput {
            user_id,
            display_name: name.to_string(),
            counters: UserStatCounters {
                user_id,
                wins,
                losses,
                draws,
            },
            recent_online: Vec::new(),
        }
    }

    fn names(rankings: &[PlayerRanking]) -> Vec<&str> {
        rankings.iter().map(|r| r.display_name.as_str()).collect()
    }

    #[test]
    fn test_streak_counts_leading_run() {
        use GameResult::*;
        assert_eq!(current_streak(&[]), (0, Win));
        assert_eq!(current_streak(&[Loss, Loss, Win, Loss]), (2, Loss));
        assert_eq!(current_streak(&[Draw]), (1, Draw));
        assert_eq!(current_streak(&[Win; 14]), (10, Win));
    }

    #[test]
    fn test_players_without_games_are_excluded() {
        let rankings = rank_players(
            vec![input("idle", 0, 0, 0), input("active", 1, 0, 0)],
            RankingSort::WinRate,
        );
        assert_eq!(names(&rankings), vec!["active"]);
        assert_eq!(rankings[0].rank, 1);
        assert_eq!(rankings[0].win_rate, 100.0);
    }

    #[test]
    fn test_sort_orders_and_tie_breaks() {
        let players = || {
            vec![
                input("steady", 6, 4, 0),  // 60%, 10 games
                input("lucky", 2, 0, 0),   // 100%, 2 games
                input("grinder", 6, 14, 0), // 30%, 20 games
                input("twin", 3, 2, 0),    // 60%, 5 games
            ]
        };

        let by_wins = rank_players(players(), RankingSort::Wins);
        assert_eq!(names(&by_wins), vec!["steady", "grinder", "twin", "lucky"]);

        let by_total = rank_players(players(), RankingSort::TotalGames);
        assert_eq!(names(&by_total), vec!["grinder", "steady", "twin", "lucky"]);

        let by_rate = rank_players(players(), RankingSort::WinRate);
        assert_eq!(names(&by_rate), vec!["lucky", "steady", "twin", "grinder"]);
        let ranks: Vec<u32> = by_rate.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_ranking_carries_streak() {
        let mut player = input("hot", 3, 1, 0);
        player.recent_online = vec![GameResult::Win, GameResult::Win, GameResult::Loss];
        let rankings = rank_players(vec![player], RankingSort::Wins);
        assert_eq!(rankings[0].streak, 2);
        assert_eq!(rankings[0].streak_type, GameResult::Win);
    }
}
