//! Codec error types
//!
//! Error codes:
//! - DOCFILE_IO_ERROR: read, write, fsync, rename or remove failed
//! - DOCFILE_CORRUPT_FILE: bytes on disk are not a valid document set
//!
//! Corruption never escapes [`StoreFile::load`](super::StoreFile::load); it is
//! only returned by the strict [`decode`](super::decode).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt store file: {0}")]
    Corrupt(String),

    #[error("failed to encode document set: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CodecError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        CodecError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Io { .. } => "DOCFILE_IO_ERROR",
            CodecError::Corrupt(_) => "DOCFILE_CORRUPT_FILE",
            CodecError::Encode(_) => "DOCFILE_IO_ERROR",
        }
    }
}
