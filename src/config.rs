//! Board configuration.

use crate::error::{BoardError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the listening port.
pub const PORT_ENV: &str = "PORT";

/// Board configuration.
#[derive(Clone, Debug)]
pub struct BoardConfig {
    /// Where the message snapshot is persisted.
    pub snapshot_path: PathBuf,

    /// How long a message stays live.
    /// Default: 3 minutes
    pub ttl: Duration,

    /// How often the sweeper prunes expired messages.
    /// Default: 60 seconds
    pub sweep_interval: Duration,

    /// Max queued events per session before it is dropped.
    /// Default: 1000
    pub session_buffer_size: usize,

    /// Listening port for the HTTP/WebSocket server.
    pub port: u16,

    /// Directory served for non-socket HTTP requests.
    pub static_dir: PathBuf,

    /// Take an exclusive lock next to the snapshot file.
    pub lock_snapshot: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("messages.json"),
            ttl: Duration::from_secs(3 * 60),
            sweep_interval: Duration::from_secs(60),
            session_buffer_size: 1000,
            port: 3001,
            static_dir: PathBuf::from("."),
            lock_snapshot: true,
        }
    }
}

impl BoardConfig {
    /// Defaults with the `PORT` override applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(port) = std::env::var(PORT_ENV) {
            config.port = parse_port(&port)?;
        }
        Ok(config)
    }

    /// Reject settings the board cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(BoardError::InvalidConfig("ttl must be non-zero".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(BoardError::InvalidConfig(
                "sweep_interval must be non-zero".into(),
            ));
        }
        if self.session_buffer_size == 0 {
            return Err(BoardError::InvalidConfig(
                "session_buffer_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| BoardError::InvalidConfig(format!("{}={:?}: {}", PORT_ENV, raw, e)))
}
