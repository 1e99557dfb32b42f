//! Observable events emitted by the store
//!
//! Events are explicit and typed; each maps to one stable log name and a
//! default severity.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store initialized and ready
    StoreOpened,
    /// Backing file did not exist and was created empty
    StoreFileCreated,
    /// Backing file deleted by purge
    StorePurged,

    // Codec
    /// Backing file failed to decode and was read as empty
    CorruptFileRecovered,
    /// Atomic replace of the backing file failed
    WriteFailed,

    // Mutations
    /// Document appended
    DocumentInserted,
    /// Document patched in place
    DocumentUpdated,
    /// Matching documents removed
    DocumentsDeleted,

    // Locking
    /// Exclusive lock not acquired in time
    LockTimeout,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpened => "STORE_OPENED",
            Event::StoreFileCreated => "STORE_FILE_CREATED",
            Event::StorePurged => "STORE_PURGED",
            Event::CorruptFileRecovered => "CORRUPT_FILE_RECOVERED",
            Event::WriteFailed => "WRITE_FAILED",
            Event::DocumentInserted => "DOCUMENT_INSERTED",
            Event::DocumentUpdated => "DOCUMENT_UPDATED",
            Event::DocumentsDeleted => "DOCUMENTS_DELETED",
            Event::LockTimeout => "LOCK_TIMEOUT",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CorruptFileRecovered | Event::LockTimeout => Severity::Warn,
            Event::WriteFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
