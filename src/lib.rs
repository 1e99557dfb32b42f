//! docfile - an embedded JSON document store
//!
//! One collection per file. Whole-file atomic rewrites, serialized writers
//! across threads and processes, lock-free reads.

pub mod codec;
pub mod crash_point;
pub mod document;
pub mod lock;
pub mod mutation;
pub mod observability;
pub mod store;

pub use document::{Document, DocumentSet, NewDocument, Patch, Query};
pub use store::{store_path, ConfigError, Store, StoreConfig, StoreError, StoreResult, StoreState};
