//! The board: application context tying the components together.

use crate::config::BoardConfig;
use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::ledger::Ledger;
use crate::snapshot::{FileSnapshotStore, SnapshotStore, SnapshotWriter};
use crate::sweeper::{Sweeper, SweeperHandle};
use crate::types::{Clock, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;

/// A running message board.
///
/// Owns the ledger, the snapshot writer, the broadcast hub and (once
/// started) the expiry sweeper. Each board is independent; nothing is
/// process-global.
pub struct Board {
    config: BoardConfig,
    ledger: Arc<Ledger>,
    writer: Arc<SnapshotWriter>,
    hub: Arc<BroadcastHub>,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl Board {
    /// Open a board persisted to `config.snapshot_path`.
    ///
    /// A missing or corrupt snapshot is logged and the board starts empty.
    /// Failing to lock the snapshot is an error.
    pub fn open(config: BoardConfig) -> Result<Self> {
        config.validate()?;
        let store = FileSnapshotStore::open(&config.snapshot_path, config.lock_snapshot)?;
        Self::with_store(config, Arc::new(store), Arc::new(SystemClock))
    }

    /// Open a board on an arbitrary snapshot store and clock.
    pub fn with_store(
        config: BoardConfig,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = Arc::new(Ledger::with_clock(config.ttl, clock));
        Self::restore(&ledger, store.as_ref());

        let writer = Arc::new(SnapshotWriter::spawn(store)?);
        let hub = Arc::new(BroadcastHub::with_buffer_size(
            Arc::clone(&ledger),
            Arc::clone(&writer),
            config.session_buffer_size,
        ));

        Ok(Self {
            config,
            ledger,
            writer,
            hub,
            sweeper: Mutex::new(None),
        })
    }

    fn restore(ledger: &Ledger, store: &dyn SnapshotStore) {
        match store.read() {
            Ok(Some(bytes)) => match ledger.load(&bytes) {
                Ok(count) => tracing::info!(count, "loaded messages from snapshot"),
                Err(e) => tracing::warn!(error = %e, "corrupt snapshot, starting empty"),
            },
            Ok(None) => tracing::info!("no snapshot found, starting empty"),
            Err(e) => tracing::warn!(error = %e, "failed to read snapshot, starting empty"),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    pub fn writer(&self) -> &Arc<SnapshotWriter> {
        &self.writer
    }

    /// A sweeper over this board's ledger, not yet running.
    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.writer),
            self.config.sweep_interval,
        )
    }

    /// Run one sweep immediately.
    pub fn sweep(&self) -> usize {
        self.sweeper().sweep()
    }

    /// Start the periodic sweeper. No-op if it is already running.
    pub fn start_sweeper(&self) -> Result<()> {
        let mut slot = self.sweeper.lock();
        if slot.is_none() {
            *slot = Some(self.sweeper().spawn()?);
            tracing::info!(
                interval_secs = self.config.sweep_interval.as_secs_f64(),
                "expiry sweeper started"
            );
        }
        Ok(())
    }

    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.stop();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Wait for every queued snapshot to be written.
    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    /// Stop the sweeper and drain the snapshot writer. Idempotent.
    ///
    /// Publishing after shutdown still updates the ledger and fans out, but
    /// nothing more is persisted.
    pub fn shutdown(&self) {
        self.stop_sweeper();
        self.writer.shutdown();
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        // Best-effort drain on drop
        self.shutdown();
    }
}
