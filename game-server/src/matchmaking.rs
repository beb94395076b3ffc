use std::collections::VecDeque;
use std::time::{Duration, Instant};

use game_types::{GameError, UserId};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub struct MatchmakingTicket {
    pub user_id: UserId,
    pub enqueued_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueueStats {
    pub size: usize,
    pub average_wait_seconds: f64,
}

/// FIFO pool of players waiting for an online opponent. Every operation
/// takes the single pool lock, so a ticket can only ever be popped once.
pub struct MatchmakingQueue {
    queue: Mutex<VecDeque<MatchmakingTicket>>,
}

impl Default for MatchmakingQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the 1-based position of the new ticket.
    pub async fn enqueue(&self, user_id: UserId) -> Result<u32, GameError> {
        let mut queue = self.queue.lock().await;

        if queue.iter().any(|t| t.user_id == user_id) {
            return Err(GameError::AlreadyQueued);
        }

        queue.push_back(MatchmakingTicket {
            user_id,
            enqueued_at: Instant::now(),
        });

        let position = queue.len() as u32;
        info!("Player {} added to queue at position {}", user_id, position);
        Ok(position)
    }

    /// Returns `false` if the user had no ticket.
    pub async fn withdraw(&self, user_id: UserId) -> bool {
        let mut queue = self.queue.lock().await;
        match queue.iter().position(|t| t.user_id == user_id) {
            Some(index) => {
                queue.remove(index);
                info!("Player {} removed from queue", user_id);
                true
            }
            None => false,
        }
    }

    /// Pops the oldest two tickets that `allowed` accepts as opponents,
    /// oldest first. Tickets skipped over keep their place.
    pub async fn pair_next(
        &self,
        allowed: impl Fn(UserId, UserId) -> bool,
    ) -> Option<(MatchmakingTicket, MatchmakingTicket)> {
        let mut queue = self.queue.lock().await;
        let (i, j) = (0..queue.len()).find_map(|i| {
            ((i + 1)..queue.len())
                .find(|&j| allowed(queue[i].user_id, queue[j].user_id))
                .map(|j| (i, j))
        })?;
        let second = queue.remove(j)?;
        let first = queue.remove(i)?;
        info!("Paired {} with {}", first.user_id, second.user_id);
        Some((first, second))
    }

    pub async fn contains(&self, user_id: UserId) -> bool {
        let queue = self.queue.lock().await;
        queue.iter().any(|t| t.user_id == user_id)
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Drops tickets older than `timeout`; returns their owners.
    pub async fn cleanup_expired(&self, timeout: Duration) -> Vec<UserId> {
        let mut queue = self.queue.lock().await;
        let mut expired = Vec::new();

        queue.retain(|ticket| {
            if ticket.enqueued_at.elapsed() > timeout {
                expired.push(ticket.user_id);
                false
            } else {
                true
            }
        });

        if !expired.is_empty() {
            info!("Removed {} expired matchmaking tickets", expired.len());
        }
        expired
    }

    pub async fn stats(&self) -> QueueStats {
        let queue = self.queue.lock().await;
        let size = queue.len();
        let average_wait_seconds = if size == 0 {
            0.0
        } else {
            let total: f64 = queue
                .iter()
                .map(|t| t.enqueued_at.elapsed().as_secs_f64())
                .sum();
            total / size as f64
        };

        QueueStats {
            size,
            average_wait_seconds,
        }
    }
}
