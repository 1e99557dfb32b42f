//! Record model for docfile
//!
//! Defines the document shape, the identity and timestamp invariants, and
//! the single-field query used for matching.
//!
//! # Invariants
//!
//! - Every stored document has a non-empty `id`, unique within its set
//! - `id` and `createdAt` never change after insertion
//! - `updatedAt` is refreshed on every successful update
//! - Document order within a set is insertion order

mod errors;
mod query;
mod record;

pub use errors::{DocumentError, DocumentResult};
pub use query::Query;
pub use record::{
    is_reserved, Document, DocumentSet, NewDocument, Patch, CREATED_AT_FIELD, ID_FIELD,
    RESERVED_FIELDS, UPDATED_AT_FIELD,
};
