//! Exclusive lock scoped to a store file path
//!
//! Two layers, one deadline:
//! 1. In-process: a registry maps each lock path to a shared
//!    `parking_lot::Mutex`, taken with a timed try-lock.
//! 2. Cross-process: an `fs2` advisory lock on `<target>.lock`, polled with
//!    `try_lock_exclusive` until the deadline.
//!
//! The lock file is never deleted. Waiters in other processes hold a handle
//! to it, and replacing the inode would let two holders in at once.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use super::errors::{LockError, LockResult};
use crate::codec::sibling_with_suffix;

type LocalLock = Arc<Mutex<()>>;

fn registry() -> &'static Mutex<HashMap<PathBuf, LocalLock>> {
    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, LocalLock>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Shared mutex for `key`. Entries no `PathLock` or guard holds any more
/// are dropped on the way in, so the registry tracks live paths only.
fn local_lock_for(key: &Path) -> LocalLock {
    let mut locks = registry().lock();
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    Arc::clone(locks.entry(key.to_path_buf()).or_default())
}

/// Lock handle for one target path.
///
/// Every `PathLock` built for the same target in this process shares the
/// same in-process mutex.
#[derive(Debug, Clone)]
pub struct PathLock {
    lock_path: PathBuf,
    local: LocalLock,
}

impl PathLock {
    /// Lock for `target`; the lock file is `<target>.lock`.
    pub fn for_target(target: &Path) -> Self {
        let lock_path = sibling_with_suffix(target, ".lock");
        let key = std::path::absolute(&lock_path).unwrap_or_else(|_| lock_path.clone());
        let local = local_lock_for(&key);
        Self { lock_path, local }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Block until both layers are held or `timeout` elapses.
    ///
    /// `retry_interval` bounds each sleep between cross-process attempts.
    pub fn acquire(&self, timeout: Duration, retry_interval: Duration) -> LockResult<PathLockGuard> {
        let started = Instant::now();
        let deadline = started + timeout;

        let local = self
            .local
            .try_lock_arc_for(timeout)
            .ok_or_else(|| self.timeout_error(started))?;

        let file = self.open_lock_file()?;

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    return Ok(PathLockGuard {
                        file,
                        _local: local,
                    })
                }
                Err(e) if is_contended(&e) => {}
                Err(e) => {
                    return Err(LockError::Io {
                        action: "failed to lock",
                        path: self.lock_path.clone(),
                        source: e,
                    })
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timeout_error(started));
            }
            thread::sleep(retry_interval.min(deadline - now));
        }
    }

    fn open_lock_file(&self) -> LockResult<File> {
        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LockError::Io {
                action: "failed to create directory",
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| LockError::Io {
                action: "failed to open lock file",
                path: self.lock_path.clone(),
                source: e,
            })
    }

    fn timeout_error(&self, started: Instant) -> LockError {
        LockError::Timeout {
            path: self.lock_path.clone(),
            waited: started.elapsed(),
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Held exclusive lock. Released on drop, file lock first.
pub struct PathLockGuard {
    file: File,
    _local: ArcMutexGuard<RawMutex, ()>,
}

impl Drop for PathLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl std::fmt::Debug for PathLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathLockGuard").finish_non_exhaustive()
    }
}
