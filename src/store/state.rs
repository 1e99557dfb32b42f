//! Store lifecycle state
//!
//! ```text
//! Uninitialized -> Ready -> Purged -> Ready -> ...
//! ```
//!
//! `Ready` is entered on the first successful ensure-file-exists and again,
//! lazily, on the first access after a purge.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Built but the backing file has not been checked yet
    Uninitialized,
    /// Backing file known to exist
    Ready,
    /// Backing file deleted by `purge_all`
    Purged,
}

impl StoreState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreState::Uninitialized => "uninitialized",
            StoreState::Ready => "ready",
            StoreState::Purged => "purged",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StoreState::Ready)
    }
}

impl fmt::Display for StoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
