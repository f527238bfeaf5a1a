//! Background snapshot writer.

use super::store::SnapshotStore;
use crate::error::{BoardError, Result};
use crate::ledger::{Ledger, LedgerSnapshot};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

enum WriterCommand {
    Write(LedgerSnapshot),
    Flush(Sender<()>),
    Shutdown,
}

/// Counters shared between the writer thread and its handle.
#[derive(Default)]
struct WriterStats {
    /// Generation of the last snapshot successfully written (0 = none).
    last_written: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
}

/// Applies ledger snapshots to a [`SnapshotStore`] on a dedicated thread.
///
/// Submissions never block. Snapshots queued behind each other are coalesced
/// to the newest generation, and a generation older than one already written
/// is discarded.
pub struct SnapshotWriter {
    sender: Sender<WriterCommand>,
    stats: Arc<WriterStats>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotWriter {
    /// Start the writer thread.
    pub fn spawn(store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let stats = Arc::new(WriterStats::default());

        let thread_stats = Arc::clone(&stats);
        let thread = thread::Builder::new()
            .name("snapshot-writer".into())
            .spawn(move || run(store, receiver, thread_stats))?;

        Ok(Self {
            sender,
            stats,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Queue a snapshot for writing.
    pub fn submit(&self, snapshot: LedgerSnapshot) -> Result<()> {
        self.sender
            .send(WriterCommand::Write(snapshot))
            .map_err(|_| BoardError::WriterStopped)
    }

    /// Snapshot `ledger` and queue it. Failures are logged, never returned.
    pub fn persist(&self, ledger: &Ledger) {
        let result = ledger.snapshot().and_then(|snapshot| self.submit(snapshot));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to queue snapshot");
        }
    }

    /// Block until everything submitted before this call has been attempted.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender
            .send(WriterCommand::Flush(ack_tx))
            .map_err(|_| BoardError::WriterStopped)?;
        ack_rx.recv().map_err(|_| BoardError::WriterStopped)
    }

    /// Drain pending work and stop the thread. Idempotent.
    pub fn shutdown(&self) {
        let Some(thread) = self.thread.lock().take() else {
            return;
        };
        let _ = self.sender.send(WriterCommand::Shutdown);
        if thread.join().is_err() {
            tracing::error!("snapshot writer thread panicked");
        }
    }

    /// Generation of the last successfully written snapshot.
    pub fn last_written_generation(&self) -> u64 {
        self.stats.last_written.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> u64 {
        self.stats.writes.load(Ordering::SeqCst)
    }

    pub fn failure_count(&self) -> u64 {
        self.stats.failures.load(Ordering::SeqCst)
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(store: Arc<dyn SnapshotStore>, receiver: Receiver<WriterCommand>, stats: Arc<WriterStats>) {
    // Highest generation attempted, successful or not. Failed generations are
    // not retried; the next mutation's snapshot supersedes them.
    let mut last_attempted: Option<u64> = None;

    while let Ok(first) = receiver.recv() {
        let mut pending: Option<LedgerSnapshot> = None;
        let mut acks = Vec::new();
        let mut stop = false;

        let mut absorb = |command: WriterCommand| match command {
            WriterCommand::Write(snapshot) => {
                let newer = pending
                    .as_ref()
                    .map_or(true, |p| snapshot.generation > p.generation);
                if newer {
                    pending = Some(snapshot);
                }
            }
            WriterCommand::Flush(ack) => acks.push(ack),
            WriterCommand::Shutdown => stop = true,
        };

        absorb(first);
        while let Ok(command) = receiver.try_recv() {
            absorb(command);
        }

        if let Some(snapshot) = pending {
            let stale = last_attempted.map_or(false, |g| snapshot.generation <= g);
            if stale {
                tracing::trace!(generation = snapshot.generation, "skipping stale snapshot");
            } else {
                last_attempted = Some(snapshot.generation);
                match store.write(&snapshot.bytes) {
                    Ok(()) => {
                        stats.last_written.store(snapshot.generation, Ordering::SeqCst);
                        stats.writes.fetch_add(1, Ordering::SeqCst);
                        tracing::debug!(
                            generation = snapshot.generation,
                            bytes = snapshot.bytes.len(),
                            "snapshot written"
                        );
                    }
                    Err(e) => {
                        stats.failures.fetch_add(1, Ordering::SeqCst);
                        tracing::warn!(
                            generation = snapshot.generation,
                            error = %e,
                            "failed to write snapshot"
                        );
                    }
                }
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }

        if stop {
            break;
        }
    }
}
