//! Snapshot storage backends.

use crate::error::{BoardError, Result};
use fs2::FileExt;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Reads and writes the persisted snapshot bytes.
pub trait SnapshotStore: Send + Sync {
    /// The last persisted snapshot, or `None` if nothing was ever written.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Overwrite the persisted snapshot.
    fn write(&self, bytes: &[u8]) -> Result<()>;
}

/// Snapshot kept in a single file, replaced via write-then-rename.
pub struct FileSnapshotStore {
    path: PathBuf,
    tmp_path: PathBuf,
    /// Held for the lifetime of the store when locking is enabled.
    _lock_file: Option<File>,
}

impl FileSnapshotStore {
    /// Open a snapshot file, optionally taking an exclusive lock beside it.
    pub fn open(path: impl AsRef<Path>, lock: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = if lock {
            Some(Self::acquire_lock(&sibling(&path, ".lock"))?)
        } else {
            None
        };

        Ok(Self {
            tmp_path: sibling(&path, ".tmp"),
            path,
            _lock_file: lock_file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(lock_path: &Path) -> Result<File> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| BoardError::Locked)?;

        Ok(lock_file)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut file = File::create(&self.tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Snapshot held in memory, for tests and ephemeral boards.
#[derive(Default)]
pub struct MemorySnapshotStore {
    bytes: Mutex<Option<Vec<u8>>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `bytes` already persisted.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
            ..Default::default()
        }
    }

    /// Make subsequent writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current contents.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.bytes.lock().clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BoardError::Io(std::io::Error::new(
                ErrorKind::Other,
                "simulated write failure",
            )));
        }
        *self.bytes.lock() = Some(bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
