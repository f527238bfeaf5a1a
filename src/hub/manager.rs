//! Broadcast hub managing sessions and the publish path.

use crate::error::{BoardError, Result};
use crate::ledger::Ledger;
use crate::snapshot::SnapshotWriter;
use crate::types::Message;
use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{ServerEvent, SessionHandle, SessionId, SessionSink};

/// Default per-session buffer for in-process subscriptions.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Manages connected sessions and fans out published messages.
pub struct BroadcastHub {
    ledger: Arc<Ledger>,
    writer: Arc<SnapshotWriter>,
    /// Active sessions by ID.
    sessions: RwLock<HashMap<SessionId, Box<dyn SessionSink>>>,
    /// Counter for generating session IDs.
    next_id: AtomicU64,
    /// Serializes publish and connect so each session sees append order.
    publish_lock: Mutex<()>,
    /// Buffer size for sessions created by [`BroadcastHub::subscribe`].
    buffer_size: usize,
}

impl BroadcastHub {
    /// Create a hub over `ledger`, persisting through `writer`.
    pub fn new(ledger: Arc<Ledger>, writer: Arc<SnapshotWriter>) -> Self {
        Self::with_buffer_size(ledger, writer, DEFAULT_BUFFER_SIZE)
    }

    /// Create a hub with a custom in-process session buffer size.
    pub fn with_buffer_size(
        ledger: Arc<Ledger>,
        writer: Arc<SnapshotWriter>,
        buffer_size: usize,
    ) -> Self {
        Self {
            ledger,
            writer,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            publish_lock: Mutex::new(()),
            buffer_size,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Register a session and replay the live ledger to it alone.
    ///
    /// The replay happens before any later broadcast reaches the session.
    /// If the sink rejects the replay the session is never registered.
    pub fn connect<S>(&self, sink: S) -> Result<SessionId>
    where
        S: SessionSink + 'static,
    {
        let _guard = self.publish_lock.lock();

        let id = SessionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let backlog = self.ledger.list();
        let replayed = backlog.len();

        if let Err(e) = sink.push(ServerEvent::LoadMessages(backlog)) {
            tracing::warn!(session = %id, error = %e, "failed to replay messages on connect");
            return Err(BoardError::SessionDropped(id));
        }

        let mut sessions = self.sessions.write();
        sessions.insert(id, Box::new(sink));
        tracing::debug!(session = %id, replayed, active = sessions.len(), "session connected");

        Ok(id)
    }

    /// Connect an in-process session backed by a bounded channel.
    pub fn subscribe(&self) -> Result<SessionHandle> {
        let (sender, receiver) = bounded(self.buffer_size);
        let id = self.connect(sender)?;
        Ok(SessionHandle { id, receiver })
    }

    /// Append `content`, persist the ledger, and fan the message out.
    ///
    /// The snapshot is queued before any session is notified. Every active
    /// session, the publisher included, receives the stored message.
    pub fn publish(&self, from: SessionId, content: serde_json::Value) -> Message {
        let _guard = self.publish_lock.lock();

        let message = self.ledger.append(content);
        self.writer.persist(&self.ledger);

        tracing::debug!(session = %from, timestamp = %message.timestamp, "message published");
        self.broadcast(ServerEvent::ChatMessage(message.clone()));

        message
    }

    /// Remove a session from the active set. Returns false if it was not there.
    pub fn disconnect(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(&id).is_some();
        if removed {
            tracing::debug!(session = %id, active = sessions.len(), "session disconnected");
        }
        removed
    }

    /// Get session count.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_connected(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    /// Push `event` to every session. Drops sessions that fail to receive.
    fn broadcast(&self, event: ServerEvent) {
        let mut to_remove = Vec::new();

        {
            let sessions = self.sessions.read();
            for (id, sink) in sessions.iter() {
                if let Err(e) = sink.push(event.clone()) {
                    tracing::warn!(session = %id, error = %e, "dropping session after failed push");
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut sessions = self.sessions.write();
            for id in to_remove {
                sessions.remove(&id);
            }
        }
    }
}
