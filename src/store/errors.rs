//! Store error types
//!
//! Every subsystem error folds into [`StoreError`], the only error type the
//! public API returns.
//!
//! Error codes:
//! - DOCFILE_DUPLICATE_KEY: insert named an id already present
//! - DOCFILE_INVALID_DOCUMENT: input was not an object or had a bad id
//! - DOCFILE_RESERVED_FIELD: patch tried to set `id`, `createdAt` or `updatedAt`
//! - DOCFILE_INVALID_QUERY: query object did not hold exactly one pair
//! - DOCFILE_LOCK_TIMEOUT: exclusive lock not acquired within the bound
//! - DOCFILE_IO_ERROR: filesystem failure, no retry
//! - DOCFILE_CORRUPT_FILE: strict decode failure
//! - DOCFILE_CONFIG_ERROR: configuration could not be loaded or is invalid

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::codec::CodecError;
use crate::document::DocumentError;
use crate::lock::LockError;
use crate::mutation::MutationError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: a document with id '{0}' already exists")]
    DuplicateKey(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("reserved field cannot be patched: {0}")]
    ReservedField(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("timed out after {waited:?} waiting for lock on {path}")]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode document set: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("corrupt store file: {0}")]
    CorruptFile(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::DuplicateKey(_) => "DOCFILE_DUPLICATE_KEY",
            StoreError::InvalidDocument(_) => "DOCFILE_INVALID_DOCUMENT",
            StoreError::ReservedField(_) => "DOCFILE_RESERVED_FIELD",
            StoreError::InvalidQuery(_) => "DOCFILE_INVALID_QUERY",
            StoreError::LockTimeout { .. } => "DOCFILE_LOCK_TIMEOUT",
            StoreError::Io { .. } | StoreError::Encode(_) => "DOCFILE_IO_ERROR",
            StoreError::CorruptFile(_) => "DOCFILE_CORRUPT_FILE",
            StoreError::Config(_) => "DOCFILE_CONFIG_ERROR",
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }
}

impl From<DocumentError> for StoreError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::DuplicateId(id) => StoreError::DuplicateKey(id),
            DocumentError::ReservedField(field) => StoreError::ReservedField(field),
            e @ DocumentError::InvalidQuery(_) => StoreError::InvalidQuery(e.to_string()),
            e @ (DocumentError::NotAnObject(_) | DocumentError::InvalidId(_)) => {
                StoreError::InvalidDocument(e.to_string())
            }
        }
    }
}

impl From<MutationError> for StoreError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::DuplicateKey(id) => StoreError::DuplicateKey(id),
            MutationError::Document(e) => e.into(),
        }
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io {
                action,
                path,
                source,
            } => StoreError::Io {
                action,
                path,
                source,
            },
            CodecError::Corrupt(reason) => StoreError::CorruptFile(reason),
            CodecError::Encode(e) => StoreError::Encode(e),
        }
    }
}

impl From<LockError> for StoreError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { path, waited } => StoreError::LockTimeout { path, waited },
            LockError::Io {
                action,
                path,
                source,
            } => StoreError::Io {
                action,
                path,
                source,
            },
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "DOCFILE_CONFIG_ERROR"
    }
}
