//! Writer exclusion for a store file
//!
//! At most one writer per backing file, across threads and processes, with
//! a bounded wait that surfaces as a timeout instead of hanging.

mod errors;
mod path_lock;

pub use errors::{LockError, LockResult};
pub use path_lock::{PathLock, PathLockGuard};
