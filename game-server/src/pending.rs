use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::anyhow;
use game_core::MoveApplied;
use game_persistence::GameStore;
use game_types::{GameId, GameResult, GameSession, Move, Room, RoomId, UserId, WinCondition};
use tracing::{debug, warn};

use crate::stats::StatsService;

/// Runs one store call, failing instead of waiting past `limit`.
pub async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| anyhow!("store did not answer within {:?}", limit))?
}

/// Side effects of a finished game, split so a retry never counts twice.
#[derive(Debug, Clone)]
enum PendingEffect {
    Counter {
        game_id: GameId,
        user_id: UserId,
        result: GameResult,
    },
    Achievements {
        game_id: GameId,
        user_id: UserId,
        result: GameResult,
        win_condition: Option<WinCondition>,
    },
}

impl PendingEffect {
    fn game_id(&self) -> GameId {
        match self {
            PendingEffect::Counter { game_id, .. } | PendingEffect::Achievements { game_id, .. } => {
                *game_id
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: HashSet<GameId>,
    pub still_pending: HashSet<GameId>,
}

// A snapshot taken later in the game's life never loses to an earlier one.
fn is_behind(candidate: &GameSession, existing: &GameSession) -> bool {
    candidate.move_count < existing.move_count
        || (existing.status.is_terminal() && !candidate.status.is_terminal())
}

/// Writes that have not reached the store yet. Written in dependency
/// order: rooms, game rows, moves, then scoring.
#[derive(Debug, Default)]
struct PendingWrites {
    rooms: HashMap<RoomId, Room>,
    games: HashMap<GameId, GameSession>,
    moves: BTreeMap<(GameId, u32), Move>,
    effects: VecDeque<PendingEffect>,
}

impl PendingWrites {
    fn len(&self) -> usize {
        self.rooms.len() + self.games.len() + self.moves.len() + self.effects.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put_game(&mut self, session: GameSession) {
        match self.games.get(&session.id) {
            Some(existing) if is_behind(&session, existing) => {}
            _ => {
                self.games.insert(session.id, session);
            }
        }
    }

    /// Folds writes queued after `self` was taken back in behind it.
    fn absorb(&mut self, newer: PendingWrites) {
        self.rooms.extend(newer.rooms);
        for session in newer.games.into_values() {
            self.put_game(session);
        }
        self.moves.extend(newer.moves);
        self.effects.extend(newer.effects);
    }

    fn games_with_pending_writes(&self) -> HashSet<GameId> {
        self.games
            .keys()
            .copied()
            .chain(self.moves.keys().map(|(game_id, _)| *game_id))
            .chain(self.effects.iter().map(PendingEffect::game_id))
            .collect()
    }

    // Stops at the first failure so nothing is written ahead of what it
    // depends on. Whatever is left in `self` afterwards was not written.
    async fn write_all(
        &mut self,
        store: &dyn GameStore,
        stats: &StatsService,
        limit: Duration,
        written: &mut HashSet<GameId>,
    ) -> anyhow::Result<()> {
        let rooms: Vec<Room> = self.rooms.values().cloned().collect();
        for room in rooms {
            bounded(limit, store.save_room(&room)).await?;
            self.rooms.remove(&room.id);
        }

        let games: Vec<GameSession> = self.games.values().cloned().collect();
        for game in games {
            bounded(limit, store.save_game(&game)).await?;
            self.games.remove(&game.id);
            written.insert(game.id);
        }

        while let Some((_, record)) = self.moves.first_key_value() {
            if !bounded(limit, store.append_move(record)).await? {
                debug!("Move {} of game {} was already stored", record.move_number, record.game_id);
            }
            written.insert(record.game_id);
            self.moves.pop_first();
        }

        while let Some(effect) = self.effects.front() {
            match effect {
                PendingEffect::Counter {
                    user_id, result, ..
                } => bounded(limit, stats.apply_counter(*user_id, *result)).await?,
                PendingEffect::Achievements {
                    game_id,
                    user_id,
                    result,
                    win_condition,
                } => {
                    bounded(
                        limit,
                        stats.evaluate_achievements(*user_id, *game_id, *result, *win_condition),
                    )
                    .await?;
                }
            }
            written.insert(effect.game_id());
            self.effects.pop_front();
        }

        Ok(())
    }
}

/// Write-behind queue between the in-memory sessions and the store.
///
/// Queueing only takes a short synchronous lock, so callers never wait on
/// store I/O. One flush runs at a time; a caller that finds a flush in
/// progress leaves its writes for that flush or the next retry.
pub struct WriteBehind {
    pending: Mutex<PendingWrites>,
    flushing: tokio::sync::Mutex<()>,
    store: Arc<dyn GameStore>,
    stats: Arc<StatsService>,
    store_timeout: Duration,
}

impl WriteBehind {
    pub fn new(store: Arc<dyn GameStore>, stats: Arc<StatsService>, store_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(PendingWrites::default()),
            flushing: tokio::sync::Mutex::new(()),
            store,
            stats,
            store_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PendingWrites> {
        // The queue is plain data; a panicked holder cannot leave it half-written.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn queue_room(&self, room: &Room) {
        self.lock().rooms.insert(room.id, room.clone());
    }

    pub fn queue_game(&self, session: &GameSession) {
        self.lock().put_game(session.clone());
    }

    pub fn queue_move(&self, applied: &MoveApplied, session: &GameSession) {
        let mut pending = self.lock();
        pending.put_game(session.clone());
        pending.moves.insert(
            (session.id, applied.record.move_number),
            applied.record.clone(),
        );
        for scored in &applied.results {
            pending.effects.push_back(PendingEffect::Counter {
                game_id: session.id,
                user_id: scored.user_id,
                result: scored.result,
            });
        }
        for scored in &applied.results {
            pending.effects.push_back(PendingEffect::Achievements {
                game_id: session.id,
                user_id: scored.user_id,
                result: scored.result,
                win_condition: scored.win_condition,
            });
        }
    }

    /// Writes everything queued so far. Returns `None` when another flush
    /// is already running.
    pub async fn flush(&self) -> Option<FlushReport> {
        let Ok(_running) = self.flushing.try_lock() else {
            debug!("Flush already in progress");
            return None;
        };

        let mut report = FlushReport::default();
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                break;
            }

            let outcome = batch
                .write_all(
                    self.store.as_ref(),
                    &self.stats,
                    self.store_timeout,
                    &mut report.written,
                )
                .await;

            if let Err(e) = outcome {
                let mut pending = self.lock();
                let newer = std::mem::take(&mut *pending);
                batch.absorb(newer);
                *pending = batch;
                warn!("Persistence degraded, {} writes pending: {:#}", pending.len(), e);
                break;
            }
        }

        report.still_pending = self.lock().games_with_pending_writes();
        Some(report)
    }
}
