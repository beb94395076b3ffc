use std::collections::HashMap;

use game_types::{EventEnvelope, EventScope, RealtimeEvent};

/// Hands out strictly increasing sequence numbers for one scope.
#[derive(Debug, Clone)]
pub struct EventSequencer {
    scope: EventScope,
    last: u64,
}

impl EventSequencer {
    pub fn new(scope: EventScope) -> Self {
        Self { scope, last: 0 }
    }

    pub fn scope(&self) -> EventScope {
        self.scope
    }

    pub fn last_sequence(&self) -> u64 {
        self.last
    }

    pub fn stamp(&mut self, event: RealtimeEvent) -> EventEnvelope {
        self.last += 1;
        EventEnvelope {
            scope: self.scope,
            sequence: self.last,
            event,
        }
    }
}

/// Receiver-side staleness filter: an envelope is applied only when its
/// sequence is strictly greater than the last one applied for its scope.
#[derive(Debug, Default, Clone)]
pub struct SequenceGuard {
    applied: HashMap<EventScope, u64>,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records the sequence if the envelope is fresh.
    pub fn accept(&mut self, envelope: &EventEnvelope) -> bool {
        let last = self.applied.entry(envelope.scope).or_insert(0);
        if envelope.sequence > *last {
            *last = envelope.sequence;
            true
        } else {
            false
        }
    }

    pub fn last_applied(&self, scope: &EventScope) -> Option<u64> {
        self.applied.get(scope).copied()
    }
}
