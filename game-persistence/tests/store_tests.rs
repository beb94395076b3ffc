use game_persistence::{GameStore, SeaOrmStore, StatsSource, connect_to_memory_database};
use game_types::{
    Board, GameMode, GameResult, GameSession, GameStatus, RankingSort, Symbol, UserId,
    UserProfile, WinCondition,
};
use migration::{Migrator, MigratorTrait};
use uuid::Uuid;

async fn setup_store() -> SeaOrmStore {
    let db = connect_to_memory_database().await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    SeaOrmStore::new(db)
}

fn finished_online(x: UserId, o: UserId, winner: Option<UserId>) -> GameSession {
    let now = chrono::Utc::now().to_rfc3339();
    GameSession {
        id: Uuid::new_v4(),
        room_id: Some(Uuid::new_v4()),
        player_x_id: x,
        player_o_id: o,
        mode: GameMode::Online,
        current_player: Symbol::O,
        status: GameStatus::Finished,
        board: Board::new(),
        winner_id: winner,
        win_condition: Some(if winner.is_some() {
            WinCondition::Horizontal
        } else {
            WinCondition::Draw
        }),
        created_at: now.clone(),
        finished_at: Some(now),
        move_count: 7,
        degraded: false,
    }
}

async fn record(store: &SeaOrmStore, game: &GameSession) {
    store.save_game(game).await.unwrap();
    for user in [game.player_x_id, game.player_o_id] {
        store
            .increment_result(user, game.result_for(user).unwrap())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_rankings_with_streaks_and_names() {
    let store = setup_store().await;
    let alice = UserProfile::new(Uuid::new_v4(), "Alice");
    let mut bob = UserProfile::new(Uuid::new_v4(), "");
    bob.username = Some("bobby".to_string());
    store.upsert_user(&alice).await.unwrap();
    store.upsert_user(&bob).await.unwrap();
    store.upsert_user(&UserProfile::new(Uuid::new_v4(), "Idle")).await.unwrap();

    record(&store, &finished_online(alice.id, bob.id, Some(bob.id))).await;
    record(&store, &finished_online(alice.id, bob.id, Some(alice.id))).await;
    record(&store, &finished_online(bob.id, alice.id, Some(alice.id))).await;

    let rankings = store.get_player_rankings(RankingSort::Wins).await.unwrap();
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0].display_name, "Alice");
    assert_eq!(rankings[0].wins, 2);
    assert_eq!(rankings[0].streak, 2);
    assert_eq!(rankings[0].streak_type, GameResult::Win);
    assert_eq!(rankings[1].display_name, "bobby");
    assert_eq!(rankings[1].rank, 2);
    assert_eq!(rankings[1].streak_type, GameResult::Loss);
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    let store = std::sync::Arc::new(setup_store().await);
    let user_id = Uuid::new_v4();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.increment_result(user_id, GameResult::Win).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.get_user_stats(user_id).await.unwrap().wins, 10);
}
