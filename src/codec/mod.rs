//! Storage file codec for docfile
//!
//! Serializes the full document set to one JSON file and back.
//!
//! # Design Principles
//!
//! - Whole-file rewrites only
//! - Temp-file-then-rename: no partial write is ever observable
//! - fsync the temp file before rename, the directory after
//! - Corruption reads as an empty set and is logged, never raised past `load`

mod errors;
mod file;

pub use errors::{CodecError, CodecResult};
pub use file::{decode, encode, LoadStatus, StoreFile, DOCUMENTS_KEY};

pub(crate) use file::sibling_with_suffix;
