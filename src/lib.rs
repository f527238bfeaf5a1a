//! # Driftboard
//!
//! A real-time broadcast message board. Clients hold a persistent duplex
//! session, receive the backlog of live messages when they connect, and then
//! every new message from any client. Messages expire after a fixed TTL, so
//! the board is a sliding-window shared feed rather than permanent storage.
//!
//! ## Core Concepts
//!
//! - **Ledger**: the in-memory ordered sequence of live messages
//! - **Snapshot**: the JSON copy of the ledger that survives restarts
//! - **Sweeper**: periodic pruning of expired messages
//! - **Hub**: session tracking, private replay and fan-out
//!
//! ## Example
//!
//! ```ignore
//! use driftboard::{Board, BoardConfig, ServerEvent};
//! use serde_json::json;
//!
//! let board = Board::open(BoardConfig {
//!     snapshot_path: "./messages.json".into(),
//!     ..Default::default()
//! })?;
//! board.start_sweeper()?;
//!
//! let session = board.hub().subscribe()?;
//! board.hub().publish(session.id, json!("Hello, board!"));
//! ```

pub mod board;
pub mod config;
pub mod error;
pub mod hub;
pub mod ledger;
pub mod server;
pub mod snapshot;
pub mod sweeper;
pub mod types;

// Re-exports
pub use board::Board;
pub use config::BoardConfig;
pub use error::{BoardError, Result};
pub use hub::{
    BroadcastHub, ClientEvent, PushError, ServerEvent, SessionHandle, SessionId, SessionSink,
};
pub use ledger::{Ledger, LedgerSnapshot};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore, SnapshotWriter};
pub use sweeper::{Sweeper, SweeperHandle};
pub use types::*;
