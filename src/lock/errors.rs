//! Path lock errors

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for lock acquisition
pub type LockResult<T> = Result<T, LockError>;

#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder kept the lock past the deadline
    #[error("timed out after {waited:?} waiting for exclusive lock on {path}")]
    Timeout { path: PathBuf, waited: Duration },

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    pub fn code(&self) -> &'static str {
        match self {
            LockError::Timeout { .. } => "DOCFILE_LOCK_TIMEOUT",
            LockError::Io { .. } => "DOCFILE_IO_ERROR",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::Timeout { .. })
    }
}
