use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use game_core::{Game, GameRoom, MoveApplied, generate_room_code, normalize_room_code};
use game_persistence::GameStore;
use game_types::{
    AI_PLAYER_ID, BlockedUser, Difficulty, EventEnvelope, GameError, GameId, GameMode, GameSession, Move,
    Position, RealtimeEvent, Role, Room, RoomId, ServerMessage, UserId, UserProfile,
};
use regex::Regex;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::ai::MoveProvider;
use crate::broadcaster::Broadcaster;
use crate::errors::ServiceError;
use crate::matchmaking::{MatchmakingQueue, QueueStats};
use crate::pending::{WriteBehind, bounded};
use crate::stats::StatsService;

static ROOM_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{6}$").expect("room code pattern compiles"));

const MATCH_ROOM_NAME: &str = "Quick match";

#[derive(Debug, Clone, Serialize)]
pub struct RoomDetails {
    pub room: Room,
    pub active_game: Option<GameSession>,
}

#[derive(Debug)]
struct ActiveGame {
    game: Game,
    difficulty: Option<Difficulty>,
    last_activity: Instant,
}

impl ActiveGame {
    fn new(game: Game, difficulty: Option<Difficulty>) -> Self {
        Self {
            game,
            difficulty,
            last_activity: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Upper bounds on the calls the manager waits for.
#[derive(Debug, Clone, Copy)]
pub struct ManagerTimeouts {
    pub ai: Duration,
    pub store: Duration,
}

/// Owns every live room and game session. In-memory state is
/// authoritative; the store is written behind it.
pub struct GameManager {
    rooms: DashMap<RoomId, Arc<Mutex<GameRoom>>>,
    room_codes: DashMap<String, RoomId>,
    user_rooms: DashMap<UserId, RoomId>,
    games: DashMap<GameId, Arc<Mutex<ActiveGame>>>,
    /// Who each signed-in user has blocked.
    blocks: DashMap<UserId, HashSet<UserId>>,
    writes: WriteBehind,
    queue: MatchmakingQueue,
    store: Arc<dyn GameStore>,
    stats: Arc<StatsService>,
    broadcaster: Arc<Broadcaster>,
    ai: Arc<dyn MoveProvider>,
    timeouts: ManagerTimeouts,
}

impl GameManager {
    pub fn new(
        store: Arc<dyn GameStore>,
        stats: Arc<StatsService>,
        broadcaster: Arc<Broadcaster>,
        ai: Arc<dyn MoveProvider>,
        timeouts: ManagerTimeouts,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            room_codes: DashMap::new(),
            user_rooms: DashMap::new(),
            games: DashMap::new(),
            blocks: DashMap::new(),
            writes: WriteBehind::new(store.clone(), stats.clone(), timeouts.store),
            queue: MatchmakingQueue::new(),
            store,
            stats,
            broadcaster,
            ai,
            timeouts,
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    // Rooms

    pub async fn create_room(&self, owner_id: UserId, name: String) -> Result<Room, ServiceError> {
        self.leave_current_room(owner_id).await;

        let code = self.unused_room_code();
        let game_room = GameRoom::create(code.clone(), name, owner_id);
        let room = game_room.room.clone();

        self.room_codes.insert(code, room.id);
        self.rooms.insert(room.id, Arc::new(Mutex::new(game_room)));
        self.user_rooms.insert(owner_id, room.id);

        self.writes.queue_room(&room);
        self.flush_pending().await;
        Ok(room)
    }

    pub async fn join_room(
        &self,
        user_id: UserId,
        code: &str,
        role: Role,
    ) -> Result<Room, ServiceError> {
        let code = normalize_room_code(code);
        if !ROOM_CODE_PATTERN.is_match(&code) {
            return Err(GameError::InvalidRoomCode { code }.into());
        }
        let room_id = self
            .room_codes
            .get(&code)
            .map(|entry| *entry)
            .ok_or(GameError::RoomNotFound)?;

        let previous = self.current_room(user_id);
        if previous == Some(room_id) {
            return Err(GameError::AlreadyJoined.into());
        }
        let handle = self.room_handle(room_id)?;

        let (room, envelope) = {
            let mut game_room = handle.lock().await;
            if self.blocked_with_member(&game_room, user_id) {
                return Err(GameError::Blocked.into());
            }
            let envelope = game_room.join(user_id, role)?;
            (game_room.room.clone(), envelope)
        };
        if let Some(previous) = previous {
            if let Err(e) = self.leave_room_by_id(user_id, previous).await {
                warn!("User {} could not leave their previous room: {}", user_id, e);
            }
        }
        self.user_rooms.insert(user_id, room_id);
        info!("User {} joined room {} as {}", user_id, room.code, role.as_str());

        self.broadcaster.send_to_room(&room, envelope).await;
        self.writes.queue_room(&room);
        self.flush_pending().await;
        Ok(room)
    }

    /// Leaving as a player abandons the room's game; the room closes when
    /// its owner leaves or nobody is left.
    pub async fn leave_room(&self, user_id: UserId) -> Result<Room, ServiceError> {
        let room_id = self.current_room(user_id).ok_or(GameError::NotInRoom)?;
        self.leave_room_by_id(user_id, room_id).await
    }

    async fn leave_room_by_id(&self, user_id: UserId, room_id: RoomId) -> Result<Room, ServiceError> {
        let handle = self.room_handle(room_id)?;

        let (room, outcome) = {
            let mut game_room = handle.lock().await;
            let outcome = game_room.leave(user_id)?;
            (game_room.room.clone(), outcome)
        };
        self.user_rooms.remove_if(&user_id, |_, id| *id == room_id);
        info!("User {} left room {}", user_id, room.code);

        if let Some(game_id) = outcome.abandon_game {
            match self.abandon_game(user_id, game_id).await {
                Ok(_) | Err(ServiceError::Rejected(GameError::GameNotActive)) => {}
                Err(e) => warn!("Could not abandon game {}: {}", game_id, e),
            }
        }

        let mut audience = room.member_ids();
        audience.push(user_id);
        for envelope in outcome.events {
            self.broadcaster.send_to_users(&audience, envelope).await;
        }

        if outcome.ended.is_some() {
            self.remove_room(&room);
        }
        self.writes.queue_room(&room);
        self.flush_pending().await;
        Ok(room)
    }

    pub async fn start_game(&self, user_id: UserId) -> Result<GameSession, ServiceError> {
        let room_id = self.current_room(user_id).ok_or(GameError::NotInRoom)?;
        let handle = self.room_handle(room_id)?;

        let (room, game) = {
            let mut game_room = handle.lock().await;
            match game_room.room.participant(user_id) {
                Some(p) if p.role == Role::Player => {}
                _ => return Err(GameError::NotParticipant.into()),
            }
            let game = game_room.start_game()?;
            (game_room.room.clone(), game)
        };

        self.writes.queue_room(&room);
        Ok(self.launch(game, None).await)
    }

    pub async fn chat(&self, user_id: UserId, message: String) -> Result<(), ServiceError> {
        let room_id = self.current_room(user_id).ok_or(GameError::NotInRoom)?;
        let handle = self.room_handle(room_id)?;
        let (room, envelope) = {
            let mut game_room = handle.lock().await;
            if self.blocked_with_member(&game_room, user_id) {
                return Err(GameError::Blocked.into());
            }
            let envelope = game_room.chat(user_id, message)?;
            (game_room.room.clone(), envelope)
        };
        self.broadcaster.send_to_room(&room, envelope).await;
        Ok(())
    }

    pub fn current_room(&self, user_id: UserId) -> Option<RoomId> {
        self.user_rooms.get(&user_id).map(|entry| *entry)
    }

    pub async fn get_room(&self, room_id: RoomId) -> Option<Room> {
        let handle = self.rooms.get(&room_id).map(|entry| entry.clone())?;
        let game_room = handle.lock().await;
        Some(game_room.room.clone())
    }

    // Local and solo games

    pub async fn start_ai_game(
        &self,
        user_id: UserId,
        difficulty: Difficulty,
    ) -> Result<GameSession, ServiceError> {
        let game = Game::create(None, user_id, AI_PLAYER_ID, GameMode::Ai);
        Ok(self.launch(game, Some(difficulty)).await)
    }

    pub async fn start_pass_play_game(&self, user_id: UserId) -> Result<GameSession, ServiceError> {
        let game = Game::create(None, user_id, user_id, GameMode::PassPlay);
        Ok(self.launch(game, None).await)
    }

    // Moves

    /// Applies a human move. In `ai` mode the computer answers before this
    /// returns; if it does not answer in time the game stays active with
    /// the computer to move.
    pub async fn submit_move(
        &self,
        user_id: UserId,
        game_id: GameId,
        position: Position,
    ) -> Result<GameSession, ServiceError> {
        if user_id == AI_PLAYER_ID {
            return Err(GameError::NotParticipant.into());
        }
        let session = self.apply_move(user_id, game_id, position).await?;
        if session.mode == GameMode::Ai && !session.status.is_terminal() {
            return self.play_ai_turn(game_id).await;
        }
        Ok(session)
    }

    pub async fn retry_ai_move(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<GameSession, ServiceError> {
        let handle = self.game_handle(game_id)?;
        {
            let active = handle.lock().await;
            if !active.game.state.is_participant(user_id) {
                return Err(GameError::NotParticipant.into());
            }
        }
        self.play_ai_turn(game_id).await
    }

    async fn play_ai_turn(&self, game_id: GameId) -> Result<GameSession, ServiceError> {
        let handle = self.game_handle(game_id)?;
        let (board, symbol, difficulty) = {
            let active = handle.lock().await;
            if !active.game.is_ai_turn() {
                return Err(GameError::NotPlayersTurn.into());
            }
            let state = &active.game.state;
            (
                state.board.clone(),
                state.current_player,
                active.difficulty.unwrap_or(Difficulty::Medium),
            )
        };

        let choice = tokio::time::timeout(
            self.timeouts.ai,
            self.ai.choose_move(&board, symbol, difficulty),
        )
        .await;

        match choice {
            Ok(Some(position)) => self.apply_move(AI_PLAYER_ID, game_id, position).await,
            Ok(None) => {
                warn!("AI had no move for game {}", game_id);
                Err(ServiceError::OpponentTimeout { game_id })
            }
            Err(_) => {
                warn!(
                    "AI did not answer within {:?} for game {}",
                    self.timeouts.ai, game_id
                );
                Err(ServiceError::OpponentTimeout { game_id })
            }
        }
    }

    async fn apply_move(
        &self,
        player_id: UserId,
        game_id: GameId,
        position: Position,
    ) -> Result<GameSession, ServiceError> {
        let handle = self.game_handle(game_id)?;

        // Validation and mutation happen under the session lock, so
        // concurrent submissions are serialised.
        let (applied, session) = {
            let mut active = handle.lock().await;
            let applied = active.game.submit_move(player_id, position)?;
            active.touch();
            (applied, active.game.state.clone())
        };
        self.writes.queue_move(&applied, &session);

        let MoveApplied { events, .. } = applied;
        self.after_change(&session, events).await;
        Ok(self.current_session(game_id).await.unwrap_or(session))
    }

    pub async fn abandon_game(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<GameSession, ServiceError> {
        let handle = self.game_handle(game_id)?;
        let (session, envelope) = {
            let mut active = handle.lock().await;
            let envelope = active.game.abandon(user_id)?;
            (active.game.state.clone(), envelope)
        };
        self.writes.queue_game(&session);

        self.after_change(&session, vec![envelope]).await;
        Ok(session)
    }

    // Matchmaking

    pub async fn join_queue(&self, user_id: UserId) -> Result<u32, ServiceError> {
        Ok(self.queue.enqueue(user_id).await?)
    }

    pub async fn leave_queue(&self, user_id: UserId) -> bool {
        self.queue.withdraw(user_id).await
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.len().await
    }

    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.stats().await
    }

    /// Pairs waiting players two at a time into fresh rooms and starts
    /// their games.
    pub async fn match_waiting_players(&self) -> Vec<GameSession> {
        let mut started = Vec::new();
        while let Some((first, second)) = self
            .queue
            .pair_next(|a, b| !self.blocked_between(a, b))
            .await
        {
            match self.create_match(first.user_id, second.user_id).await {
                Ok(session) => started.push(session),
                Err(e) => warn!(
                    "Could not start match for {} and {}: {}",
                    first.user_id, second.user_id, e
                ),
            }
        }
        started
    }

    async fn create_match(
        &self,
        player_x: UserId,
        player_o: UserId,
    ) -> Result<GameSession, ServiceError> {
        self.leave_current_room(player_x).await;
        self.leave_current_room(player_o).await;

        let code = self.unused_room_code();
        let mut game_room = GameRoom::create(code.clone(), MATCH_ROOM_NAME.to_string(), player_x);
        game_room.join(player_o, Role::Player)?;
        let game = game_room.start_game()?;
        let room = game_room.room.clone();

        self.room_codes.insert(code, room.id);
        self.rooms.insert(room.id, Arc::new(Mutex::new(game_room)));
        self.user_rooms.insert(player_x, room.id);
        self.user_rooms.insert(player_o, room.id);

        let game_id = game.id();
        for user_id in [player_x, player_o] {
            self.broadcaster
                .notify_user(
                    user_id,
                    RealtimeEvent::MatchFound {
                        room: room.clone(),
                        game_id,
                    },
                )
                .await;
        }

        self.writes.queue_room(&room);
        Ok(self.launch(game, None).await)
    }

    pub async fn expire_queue_tickets(&self, timeout: Duration) -> Vec<UserId> {
        let expired = self.queue.cleanup_expired(timeout).await;
        for user_id in &expired {
            self.broadcaster
                .send_message(*user_id, ServerMessage::QueueLeft)
                .await;
        }
        expired
    }

    // Connections

    /// Records the identity details of a signed-in user and returns the
    /// profile to use for the session. Names missing from the token are
    /// taken from the stored profile. Sign-in does not depend on the store
    /// being reachable.
    pub async fn remember_user(&self, profile: &UserProfile) -> UserProfile {
        let merged = match bounded(self.timeouts.store, self.store.get_user(profile.id)).await {
            Ok(Some(stored)) => UserProfile {
                id: profile.id,
                display_name: profile.display_name.clone().or(stored.display_name),
                username: profile.username.clone().or(stored.username),
                email: profile.email.clone().or(stored.email),
            },
            Ok(None) => profile.clone(),
            Err(e) => {
                warn!("Could not load stored profile of {}: {:#}", profile.id, e);
                profile.clone()
            }
        };

        if let Err(e) = bounded(self.timeouts.store, self.store.upsert_user(&merged)).await {
            warn!("Could not store profile of {}: {:#}", merged.id, e);
        }

        match bounded(self.timeouts.store, self.store.blocked_users(merged.id)).await {
            Ok(blocked) => {
                let blocked = blocked.into_iter().map(|block| block.blocked_id).collect();
                self.blocks.insert(merged.id, blocked);
            }
            Err(e) => warn!("Could not load block list of {}: {:#}", merged.id, e),
        }
        merged
    }

    // Blocking

    /// Records that `blocker_id` no longer wants to meet `blocked_id`.
    /// Returns the blocker's updated list.
    pub async fn block_user(
        &self,
        blocker_id: UserId,
        blocked_id: UserId,
    ) -> Result<Vec<BlockedUser>, ServiceError> {
        if blocker_id == blocked_id {
            return Err(GameError::CannotBlockSelf.into());
        }
        if bounded(self.timeouts.store, self.store.block_user(blocker_id, blocked_id)).await? {
            info!("User {} blocked {}", blocker_id, blocked_id);
        }
        self.blocks.entry(blocker_id).or_default().insert(blocked_id);
        self.blocked_users(blocker_id).await
    }

    pub async fn unblock_user(
        &self,
        blocker_id: UserId,
        blocked_id: UserId,
    ) -> Result<Vec<BlockedUser>, ServiceError> {
        if bounded(self.timeouts.store, self.store.unblock_user(blocker_id, blocked_id)).await? {
            info!("User {} unblocked {}", blocker_id, blocked_id);
        }
        if let Some(mut blocked) = self.blocks.get_mut(&blocker_id) {
            blocked.remove(&blocked_id);
        }
        self.blocked_users(blocker_id).await
    }

    pub async fn blocked_users(&self, user_id: UserId) -> Result<Vec<BlockedUser>, ServiceError> {
        Ok(bounded(self.timeouts.store, self.store.blocked_users(user_id)).await?)
    }

    /// True when either user has blocked the other.
    pub fn blocked_between(&self, a: UserId, b: UserId) -> bool {
        let has_blocked = |blocker: UserId, blocked: UserId| {
            self.blocks
                .get(&blocker)
                .is_some_and(|list| list.contains(&blocked))
        };
        has_blocked(a, b) || has_blocked(b, a)
    }

    fn blocked_with_member(&self, game_room: &GameRoom, user_id: UserId) -> bool {
        game_room
            .room
            .member_ids()
            .into_iter()
            .any(|member| member != user_id && self.blocked_between(user_id, member))
    }

    pub async fn handle_connect(&self, user_id: UserId) {
        self.broadcaster.user_online(user_id).await;
    }

    /// Called once per closed connection. Rooms and games survive a
    /// disconnect; the matchmaking ticket does not.
    pub async fn handle_disconnect(&self, user_id: UserId) {
        if self.queue.withdraw(user_id).await {
            debug!("Withdrew ticket of disconnected user {}", user_id);
        }
        self.broadcaster.user_offline(user_id).await;
    }

    // Lookups

    pub async fn get_game(&self, game_id: GameId) -> Result<Option<GameSession>, ServiceError> {
        if let Some(session) = self.current_session(game_id).await {
            return Ok(Some(session));
        }
        Ok(bounded(self.timeouts.store, self.store.get_game(game_id)).await?)
    }

    pub async fn get_game_moves(&self, game_id: GameId) -> Result<Vec<Move>, ServiceError> {
        if let Some(handle) = self.games.get(&game_id).map(|entry| entry.clone()) {
            let active = handle.lock().await;
            return Ok(active.game.moves().to_vec());
        }
        Ok(bounded(self.timeouts.store, self.store.get_game_moves(game_id)).await?)
    }

    /// Looks a room up by its share code. Rooms no longer held in memory,
    /// such as closed ones, are read back from the store.
    pub async fn find_room(&self, code: &str) -> Result<Option<RoomDetails>, ServiceError> {
        let code = normalize_room_code(code);
        if !ROOM_CODE_PATTERN.is_match(&code) {
            return Err(GameError::InvalidRoomCode { code }.into());
        }

        let live_room = match self.room_codes.get(&code).map(|entry| *entry) {
            Some(room_id) => self.get_room(room_id).await,
            None => None,
        };
        let limit = self.timeouts.store;
        let room = match live_room {
            Some(room) => room,
            None => match bounded(limit, self.store.get_room_by_code(&code)).await? {
                Some(room) => room,
                None => return Ok(None),
            },
        };

        let live_game = match room.active_game_id {
            Some(game_id) => self.current_session(game_id).await,
            None => None,
        };
        let active_game = match live_game {
            Some(session) => Some(session),
            None => bounded(limit, self.store.get_active_game_by_room(room.id)).await?,
        };

        Ok(Some(RoomDetails { room, active_game }))
    }

    pub fn active_game_count(&self) -> usize {
        self.games.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // Persistence

    pub fn pending_count(&self) -> usize {
        self.writes.len()
    }

    /// Called periodically; returns how many writes are still pending.
    pub async fn retry_pending(&self) -> usize {
        let before = self.pending_count();
        if before == 0 {
            return 0;
        }
        self.flush_pending().await;
        let after = self.pending_count();
        if after < before {
            info!("Flushed {} pending writes, {} remain", before - after, after);
        }
        after
    }

    /// Drops sessions idle for longer than `timeout`, abandoning any that
    /// were still active. Returns how many sessions were dropped.
    pub async fn cleanup_inactive_games(&self, timeout: Duration) -> usize {
        let handles: Vec<(GameId, Arc<Mutex<ActiveGame>>)> = self
            .games
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut removed = 0;
        for (game_id, handle) in handles {
            let expired = {
                let mut active = handle.lock().await;
                if !active.is_expired(timeout) {
                    continue;
                }
                let envelope = active.game.expire();
                envelope.map(|envelope| (active.game.state.clone(), envelope))
            };

            if let Some((session, envelope)) = expired {
                self.writes.queue_game(&session);
                self.after_change(&session, vec![envelope]).await;
            }
            self.games.remove(&game_id);
            removed += 1;
        }

        if removed > 0 {
            info!("Cleaned up {} inactive games", removed);
        }
        removed
    }

    // Internals

    async fn launch(&self, mut game: Game, difficulty: Option<Difficulty>) -> GameSession {
        let envelope = game.started_event();
        let session = game.state.clone();
        self.games
            .insert(session.id, Arc::new(Mutex::new(ActiveGame::new(game, difficulty))));
        info!(
            "Started {} game {} ({} vs {})",
            session.mode.as_str(),
            session.id,
            session.player_x_id,
            session.player_o_id
        );

        self.writes.queue_game(&session);
        self.after_change(&session, vec![envelope]).await;
        self.current_session(session.id).await.unwrap_or(session)
    }

    /// Publishes the events, frees the room once the game is over and
    /// pushes pending writes out.
    async fn after_change(&self, session: &GameSession, events: Vec<EventEnvelope>) {
        if session.status.is_terminal() {
            if let Some(room_id) = session.room_id {
                if let Some(handle) = self.rooms.get(&room_id).map(|entry| entry.clone()) {
                    let room = {
                        let mut game_room = handle.lock().await;
                        game_room.game_ended(session.id);
                        game_room.room.clone()
                    };
                    self.writes.queue_room(&room);
                }
            }
        }

        let audience = self.game_audience(session).await;
        for envelope in events {
            self.broadcaster.send_to_users(&audience, envelope).await;
        }

        self.flush_pending().await;
    }

    /// Room members for room games, plus the human players in any case.
    async fn game_audience(&self, session: &GameSession) -> Vec<UserId> {
        let mut audience = Vec::new();
        if let Some(handle) = session
            .room_id
            .and_then(|id| self.rooms.get(&id).map(|entry| entry.clone()))
        {
            let game_room = handle.lock().await;
            audience = game_room.room.member_ids();
        }
        for player in [session.player_x_id, session.player_o_id] {
            if player != AI_PLAYER_ID && !audience.contains(&player) {
                audience.push(player);
            }
        }
        audience
    }

    async fn current_session(&self, game_id: GameId) -> Option<GameSession> {
        let handle = self.games.get(&game_id).map(|entry| entry.clone())?;
        let active = handle.lock().await;
        Some(active.game.state.clone())
    }

    fn game_handle(&self, game_id: GameId) -> Result<Arc<Mutex<ActiveGame>>, GameError> {
        self.games
            .get(&game_id)
            .map(|entry| entry.clone())
            .ok_or(GameError::GameNotFound)
    }

    fn room_handle(&self, room_id: RoomId) -> Result<Arc<Mutex<GameRoom>>, GameError> {
        self.rooms
            .get(&room_id)
            .map(|entry| entry.clone())
            .ok_or(GameError::RoomNotFound)
    }

    fn unused_room_code(&self) -> String {
        loop {
            let code = generate_room_code();
            if !self.room_codes.contains_key(&code) {
                return code;
            }
        }
    }

    async fn leave_current_room(&self, user_id: UserId) {
        if self.current_room(user_id).is_some() {
            if let Err(e) = self.leave_room(user_id).await {
                warn!("User {} could not leave their previous room: {}", user_id, e);
            }
        }
    }

    fn remove_room(&self, room: &Room) {
        self.rooms.remove(&room.id);
        self.room_codes.remove_if(&room.code, |_, id| *id == room.id);
        for member in room.member_ids() {
            self.user_rooms.remove_if(&member, |_, id| *id == room.id);
        }
        debug!("Removed room {} ({})", room.code, room.id);
    }

    // Must not be called while holding a session lock.
    async fn flush_pending(&self) {
        if self.writes.is_empty() {
            return;
        }
        let Some(report) = self.writes.flush().await else {
            return;
        };

        for game_id in report.written.union(&report.still_pending) {
            let Some(handle) = self.games.get(game_id).map(|entry| entry.clone()) else {
                continue;
            };
            let mut active = handle.lock().await;
            let degraded = report.still_pending.contains(game_id);
            if active.game.state.degraded != degraded {
                if degraded {
                    warn!("Game {} is running degraded", game_id);
                } else {
                    info!("Game {} is fully persisted again", game_id);
                }
                active.game.state.degraded = degraded;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_pattern() {
        assert!(ROOM_CODE_PATTERN.is_match("AB12CD"));
        assert!(!ROOM_CODE_PATTERN.is_match("AB12C"));
        assert!(!ROOM_CODE_PATTERN.is_match("ab12cd"));
        assert!(!ROOM_CODE_PATTERN.is_match("AB-2CD"));
        assert!(ROOM_CODE_PATTERN.is_match(&generate_room_code()));
    }
}
