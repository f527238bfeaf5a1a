//! The message ledger: the ordered sequence of live messages.
//!
//! The ledger is the only writer of truth. Messages are appended in arrival
//! order, stamped by the ledger's clock, and removed only by [`Ledger::prune`]
//! or a wholesale [`Ledger::load`]. Reads never filter by TTL; expiry is the
//! sweeper's job on its own cadence.
//!
//! Every mutation bumps a generation counter so persisted snapshots can be
//! ordered without holding the ledger lock across I/O.

use crate::error::{BoardError, Result};
use crate::types::{Clock, Message, SystemClock, Timestamp};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Serialized ledger contents tagged with the generation they were taken at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub generation: u64,
    pub bytes: Vec<u8>,
}

/// How far a new stamp may be held ahead of the clock to stay ordered.
const CLOCK_STEP_TOLERANCE_MS: i64 = 1_000;

#[derive(Default)]
struct LedgerState {
    messages: Vec<Message>,
    generation: u64,
    /// Last stamp handed out by `append` in this process; loaded messages
    /// never set it.
    last_stamped: Option<Timestamp>,
}

impl LedgerState {
    fn bump(&mut self) {
        self.generation += 1;
    }
}

/// In-memory ordered message store with TTL-based pruning.
pub struct Ledger {
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl Ledger {
    /// Create an empty ledger on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create an empty ledger on a custom clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            clock,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current time on the ledger's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Stamp `content` and append it to the end of the sequence.
    ///
    /// The stamp is the clock's current reading. If the clock stepped back by
    /// at most [`CLOCK_STEP_TOLERANCE_MS`] since this ledger's previous
    /// append, that previous stamp is reused so appends stay ordered. Larger
    /// steps and stamps inherited from a loaded snapshot are ignored.
    pub fn append(&self, content: serde_json::Value) -> Message {
        let now = self.clock.now();
        let mut state = self.state.write();

        let timestamp = match state.last_stamped {
            Some(last) if last > now && now.millis_until(last) <= CLOCK_STEP_TOLERANCE_MS => last,
            _ => now,
        };

        let message = Message { content, timestamp };
        state.messages.push(message.clone());
        state.last_stamped = Some(timestamp);
        state.bump();
        message
    }

    /// The live sequence in arrival order.
    pub fn list(&self) -> Vec<Message> {
        self.state.read().messages.clone()
    }

    /// Remove every message older than the TTL as of `now`.
    ///
    /// Survivors keep their relative order. Returns how many were removed.
    pub fn prune(&self, now: Timestamp) -> usize {
        let ttl = self.ttl;
        let mut state = self.state.write();

        let before = state.messages.len();
        state.messages.retain(|m| !m.is_expired(now, ttl));
        let removed = before - state.messages.len();

        if removed > 0 {
            state.bump();
        }
        removed
    }

    /// Replace the sequence with the messages encoded in `bytes`.
    ///
    /// On malformed input the ledger is left empty and a
    /// [`BoardError::Deserialization`] is returned.
    pub fn load(&self, bytes: &[u8]) -> Result<usize> {
        let parsed = serde_json::from_slice::<Vec<Message>>(bytes);
        let mut state = self.state.write();
        state.bump();
        state.last_stamped = None;

        match parsed {
            Ok(messages) => {
                let count = messages.len();
                state.messages = messages;
                Ok(count)
            }
            Err(e) => {
                state.messages.clear();
                Err(BoardError::Deserialization(e.to_string()))
            }
        }
    }

    /// Encode the current sequence as a JSON array.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.state.read().messages)?)
    }

    /// Encode the current sequence together with its generation.
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.state.read();
        Ok(LedgerSnapshot {
            generation: state.generation,
            bytes: serde_json::to_vec(&state.messages)?,
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of mutations applied so far.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }
}
