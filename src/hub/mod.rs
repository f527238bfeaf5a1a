//! Broadcast hub for connected sessions.
//!
//! The hub tracks the active session set and drives the publish path:
//! append to the ledger, hand the new snapshot to the writer, then fan the
//! message out to every session, including the publisher.
//!
//! # Example
//!
//! ```ignore
//! let session = hub.subscribe()?;
//!
//! // First event is always the private replay.
//! let ServerEvent::LoadMessages(backlog) = session.recv()? else { unreachable!() };
//!
//! hub.publish(session.id, json!("hello"));
//! let ServerEvent::ChatMessage(echo) = session.recv()? else { unreachable!() };
//!
//! hub.disconnect(session.id);
//! ```

mod manager;
mod types;

pub use manager::BroadcastHub;
pub use types::{ClientEvent, PushError, ServerEvent, SessionHandle, SessionId, SessionSink};
