//! Durable snapshot of the ledger.
//!
//! The snapshot is a JSON array of messages in arrival order. Persistence is
//! best-effort: the in-memory ledger stays authoritative for the running
//! process and write failures are logged, never propagated to clients.
//!
//! - [`SnapshotStore`] is the raw read/write boundary.
//! - [`SnapshotWriter`] owns a background thread that applies writes in
//!   generation order, so callers never block on disk.

mod store;
mod writer;

pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use writer::SnapshotWriter;
