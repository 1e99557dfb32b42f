//! Mutation engine
//!
//! Pure transformations over an in-memory [`DocumentSet`](crate::document::DocumentSet):
//! matching, insert, update and delete. No I/O, no locking; the store
//! controller wraps each call in a load/save critical section.

mod engine;
mod errors;

pub use engine::{delete_matching, filter_out, find_one, insert, position, update_one};
pub use errors::{MutationError, MutationResult};
