#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use game_core::HistoryEntry;
use game_persistence::{
    GameStore, IdentityProvider, SeaOrmStore, SnapshotStatsSource, StatsSource,
    connect_to_memory_database,
};
use game_server::ai::{HeuristicAi, MoveProvider};
use game_server::build_game_manager;
use game_server::game_manager::{GameManager, ManagerTimeouts};
use game_server::websocket::connection::{ConnectionId, ConnectionManager};
use game_types::{
    AchievementRecord, AchievementType, BlockedUser, Board, Difficulty, GameId, GameResult,
    GameSession, Move, OnlineGameStats, PlayerRanking, Position, RankingSort, Role, Room, RoomId,
    ServerMessage, Symbol, Theme, ThemeUnlock, UserId, UserProfile, UserStatCounters,
};
use migration::{Migrator, MigratorTrait};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

/// Database-backed store that can be switched off to simulate an outage,
/// or made to hang on move writes.
pub struct FlakyStore {
    inner: SeaOrmStore,
    offline: AtomicBool,
    hang_on_moves: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: SeaOrmStore) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            hang_on_moves: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_hang_on_moves(&self, hang: bool) {
        self.hang_on_moves.store(hang, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("database is offline");
        }
        Ok(())
    }
}

#[async_trait]
impl StatsSource for FlakyStore {
    async fn get_user_stats(&self, user_id: UserId) -> Result<UserStatCounters> {
        self.check()?;
        self.inner.get_user_stats(user_id).await
    }

    async fn get_online_game_stats(&self, user_id: UserId) -> Result<OnlineGameStats> {
        self.check()?;
        self.inner.get_online_game_stats(user_id).await
    }

    async fn get_player_rankings(&self, sort_by: RankingSort) -> Result<Vec<PlayerRanking>> {
        self.check()?;
        self.inner.get_player_rankings(sort_by).await
    }

    async fn get_user_achievements(&self, user_id: UserId) -> Result<Vec<AchievementRecord>> {
        self.check()?;
        self.inner.get_user_achievements(user_id).await
    }

    async fn get_user_themes(&self, user_id: UserId) -> Result<Vec<ThemeUnlock>> {
        self.check()?;
        self.inner.get_user_themes(user_id).await
    }
}

#[async_trait]
impl IdentityProvider for FlakyStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        self.check()?;
        self.inner.get_user(user_id).await
    }
}

#[async_trait]
impl GameStore for FlakyStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        self.check()?;
        self.inner.upsert_user(profile).await
    }

    async fn save_room(&self, room: &Room) -> Result<()> {
        self.check()?;
        self.inner.save_room(room).await
    }

    async fn get_room_by_code(&self, code: &str) -> Result<Option<Room>> {
        self.check()?;
        self.inner.get_room_by_code(code).await
    }

    async fn get_active_game_by_room(&self, room_id: RoomId) -> Result<Option<GameSession>> {
        self.check()?;
        self.inner.get_active_game_by_room(room_id).await
    }

    async fn save_game(&self, game: &GameSession) -> Result<()> {
        self.check()?;
        self.inner.save_game(game).await
    }

    async fn append_move(&self, record: &Move) -> Result<bool> {
        self.check()?;
        if self.hang_on_moves.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.append_move(record).await
    }

    async fn get_game(&self, game_id: GameId) -> Result<Option<GameSession>> {
        self.check()?;
        self.inner.get_game(game_id).await
    }

    async fn get_game_moves(&self, game_id: GameId) -> Result<Vec<Move>> {
        self.check()?;
        self.inner.get_game_moves(game_id).await
    }

    async fn increment_result(&self, user_id: UserId, result: GameResult) -> Result<()> {
        self.check()?;
        self.inner.increment_result(user_id, result).await
    }

    async fn recent_results(&self, user_id: UserId, limit: u64) -> Result<Vec<HistoryEntry>> {
        self.check()?;
        self.inner.recent_results(user_id, limit).await
    }

    async fn diagonal_wins(&self, user_id: UserId) -> Result<u32> {
        self.check()?;
        self.inner.diagonal_wins(user_id).await
    }

    async fn granted_achievements(&self, user_id: UserId) -> Result<Vec<AchievementType>> {
        self.check()?;
        self.inner.granted_achievements(user_id).await
    }

    async fn grant_achievement(&self, record: &AchievementRecord) -> Result<bool> {
        self.check()?;
        self.inner.grant_achievement(record).await
    }

    async fn unlock_theme(&self, user_id: UserId, theme: Theme) -> Result<bool> {
        self.check()?;
        self.inner.unlock_theme(user_id, theme).await
    }

    async fn block_user(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool> {
        self.check()?;
        self.inner.block_user(blocker_id, blocked_id).await
    }

    async fn unblock_user(&self, blocker_id: UserId, blocked_id: UserId) -> Result<bool> {
        self.check()?;
        self.inner.unblock_user(blocker_id, blocked_id).await
    }

    async fn blocked_users(&self, blocker_id: UserId) -> Result<Vec<BlockedUser>> {
        self.check()?;
        self.inner.blocked_users(blocker_id).await
    }
}

/// AI that never answers within any sensible timeout.
pub struct SlowAi;

#[async_trait]
impl MoveProvider for SlowAi {
    async fn choose_move(
        &self,
        board: &Board,
        symbol: Symbol,
        difficulty: Difficulty,
    ) -> Option<Position> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        HeuristicAi::pick(board, symbol, difficulty)
    }
}

pub struct TestGameServerSetup {
    pub connection_manager: Arc<ConnectionManager>,
    pub game_manager: Arc<GameManager>,
    pub store: Arc<FlakyStore>,
}

impl TestGameServerSetup {
    pub async fn new() -> Self {
        Self::with_ai(Arc::new(HeuristicAi::new()), Duration::from_millis(500)).await
    }

    pub async fn with_ai(ai: Arc<dyn MoveProvider>, ai_timeout: Duration) -> Self {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let store = Arc::new(FlakyStore::new(SeaOrmStore::new(db)));
        let connection_manager = Arc::new(ConnectionManager::new());
        let game_manager = build_game_manager(
            store.clone(),
            Arc::new(SnapshotStatsSource::default()),
            connection_manager.clone(),
            ai,
            ManagerTimeouts {
                ai: ai_timeout,
                store: Duration::from_millis(200),
            },
        );

        Self {
            connection_manager,
            game_manager,
            store,
        }
    }

    /// Signs a fresh user in on one connection; keep the receiver alive to
    /// observe what the server sends.
    pub async fn connect_user(&self, name: &str) -> (UserId, UnboundedReceiver<ServerMessage>) {
        let user_id = Uuid::new_v4();
        let connection_id = ConnectionId::new();
        let profile = UserProfile::new(user_id, name);
        let receiver = self.connection_manager.create_connection(connection_id).await;
        self.connection_manager
            .authenticate_connection(connection_id, profile.clone())
            .await
            .unwrap();
        self.game_manager.remember_user(&profile).await;
        (user_id, receiver)
    }

    /// Owner creates a room, a second player joins it, and the game starts.
    pub async fn start_room_game(&self, owner: UserId, guest: UserId) -> (Room, GameSession) {
        let room = self
            .game_manager
            .create_room(owner, "Test room".to_string())
            .await
            .unwrap();
        self.game_manager
            .join_room(guest, &room.code, Role::Player)
            .await
            .unwrap();
        let game = self.game_manager.start_game(owner).await.unwrap();
        (room, game)
    }

    /// X takes 1-4 while O fills the middle row.
    pub async fn play_row_win(&self, game: &GameSession) -> GameSession {
        let (x, o) = (game.player_x_id, game.player_o_id);
        let script = [(x, 1), (o, 6), (x, 2), (o, 7), (x, 3), (o, 8), (x, 4)];
        let mut last = None;
        for (player, position) in script {
            last = Some(
                self.game_manager
                    .submit_move(player, game.id, position)
                    .await
                    .unwrap(),
            );
        }
        last.unwrap()
    }
}

/// Drains everything currently queued for a connection.
pub fn drain(receiver: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = receiver.try_recv() {
        messages.push(message);
    }
    messages
}
