//! Periodic expiry sweep.
//!
//! On every tick the sweeper prunes the ledger and, if anything was removed,
//! queues a fresh snapshot. It runs on its own thread independent of message
//! traffic; a late tick simply covers a longer window.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::snapshot::SnapshotWriter;
use crate::types::Timestamp;
use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Prunes expired messages on a fixed interval.
pub struct Sweeper {
    ledger: Arc<Ledger>,
    writer: Arc<SnapshotWriter>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(ledger: Arc<Ledger>, writer: Arc<SnapshotWriter>, interval: Duration) -> Self {
        Self {
            ledger,
            writer,
            interval,
        }
    }

    /// Sweep as of the ledger's current time.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.ledger.now())
    }

    /// Prune as of `now`, persisting only if something was removed.
    pub fn sweep_at(&self, now: Timestamp) -> usize {
        let removed = self.ledger.prune(now);
        if removed > 0 {
            self.writer.persist(&self.ledger);
            tracing::info!(removed, remaining = self.ledger.len(), "expired messages removed");
        } else {
            tracing::trace!("sweep found nothing to expire");
        }
        removed
    }

    /// Run the sweep loop on a background thread.
    pub fn spawn(self) -> Result<SweeperHandle> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let sweeps = Arc::new(AtomicU64::new(0));
        let thread_sweeps = Arc::clone(&sweeps);

        let thread = thread::Builder::new()
            .name("expiry-sweeper".into())
            .spawn(move || {
                let ticker = tick(self.interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            self.sweep();
                            thread_sweeps.fetch_add(1, Ordering::SeqCst);
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
            })?;

        Ok(SweeperHandle {
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
            sweeps,
        })
    }
}

/// Handle to a running sweeper thread. Stops the thread on drop.
pub struct SweeperHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    sweeps: Arc<AtomicU64>,
}

impl SweeperHandle {
    /// Number of ticks processed so far.
    pub fn sweep_count(&self) -> u64 {
        self.sweeps.load(Ordering::SeqCst)
    }

    /// Stop the sweeper and wait for its thread to exit.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        // Dropping the sender wakes the loop.
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("expiry sweeper thread panicked");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.stop_inner();
    }
}
