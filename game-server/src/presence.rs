use std::collections::HashMap;
use std::sync::Mutex;

use game_types::UserId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    /// Bumped on every change to the online set; used as the presence sequence.
    pub version: u64,
    pub online_users: Vec<UserId>,
}

#[derive(Debug, Default)]
struct PresenceState {
    connections: HashMap<UserId, usize>,
    version: u64,
}

/// Online users counted by open connections, so a second tab closing does
/// not take the user offline.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    state: Mutex<PresenceState>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PresenceState> {
        // Counters stay consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the new snapshot when the user just came online.
    pub fn connect(&self, user_id: UserId) -> Option<PresenceSnapshot> {
        let mut state = self.lock();
        let count = state.connections.entry(user_id).or_insert(0);
        *count += 1;
        if *count == 1 {
            state.version += 1;
            Some(Self::snapshot_of(&state))
        } else {
            None
        }
    }

    /// Returns the new snapshot when the user's last connection closed.
    pub fn disconnect(&self, user_id: UserId) -> Option<PresenceSnapshot> {
        let mut state = self.lock();
        let remaining = match state.connections.get_mut(&user_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return None,
        };
        if remaining == 0 {
            state.connections.remove(&user_id);
            state.version += 1;
            Some(Self::snapshot_of(&state))
        } else {
            None
        }
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.lock().connections.contains_key(&user_id)
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        Self::snapshot_of(&self.lock())
    }

    fn snapshot_of(state: &PresenceState) -> PresenceSnapshot {
        let mut online_users: Vec<UserId> = state.connections.keys().copied().collect();
        online_users.sort();
        PresenceSnapshot {
            version: state.version,
            online_users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_counts_connections_per_user() {
        let presence = PresenceRegistry::new();
        let user = Uuid::new_v4();

        let first = presence.connect(user).unwrap();
        assert_eq!(first.online_users, vec![user]);
        assert!(presence.connect(user).is_none());

        assert!(presence.disconnect(user).is_none());
        assert!(presence.is_online(user));

        let last = presence.disconnect(user).unwrap();
        assert!(last.online_users.is_empty());
        assert!(last.version > first.version);
        assert!(!presence.is_online(user));
    }

    #[test]
    fn test_unknown_disconnect_is_ignored() {
        let presence = PresenceRegistry::new();
        assert!(presence.disconnect(Uuid::new_v4()).is_none());
        assert_eq!(presence.snapshot().version, 0);
    }
}
