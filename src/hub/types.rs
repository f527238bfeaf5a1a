//! Session and wire event types.

use crate::types::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a connected session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Events pushed from the board to a client.
///
/// Encoded as `{"event": "<name>", "data": <payload>}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Private replay of the live ledger, sent once right after connect.
    #[serde(rename = "load messages")]
    LoadMessages(Vec<Message>),

    /// A newly published message, fanned out to every session.
    #[serde(rename = "chat message")]
    ChatMessage(Message),
}

/// Events sent from a client to the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Publish request; the payload is opaque.
    #[serde(rename = "chat message")]
    ChatMessage(serde_json::Value),
}

/// Why an event could not be handed to a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("session buffer is full")]
    Full,
    #[error("session channel is closed")]
    Closed,
}

/// The channel handle used to push events to one client.
///
/// `push` must not block; a session that cannot accept an event is dropped.
pub trait SessionSink: Send + Sync {
    fn push(&self, event: ServerEvent) -> Result<(), PushError>;
}

impl SessionSink for crossbeam_channel::Sender<ServerEvent> {
    fn push(&self, event: ServerEvent) -> Result<(), PushError> {
        self.try_send(event).map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(_) => PushError::Full,
            crossbeam_channel::TrySendError::Disconnected(_) => PushError::Closed,
        })
    }
}

impl SessionSink for tokio::sync::mpsc::Sender<ServerEvent> {
    fn push(&self, event: ServerEvent) -> Result<(), PushError> {
        self.try_send(event).map_err(|e| match e {
            tokio::sync::mpsc::error::TrySendError::Full(_) => PushError::Full,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => PushError::Closed,
        })
    }
}

/// Handle to an in-process session backed by a bounded channel.
pub struct SessionHandle {
    pub id: SessionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<ServerEvent>,
}

impl SessionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ServerEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ServerEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ServerEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
