//! Mutation engine errors

use thiserror::Error;

use crate::document::DocumentError;

/// Result type for mutation operations
pub type MutationResult<T> = Result<T, MutationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// Insert named an id already present in the set
    #[error("duplicate key: a document with id '{0}' already exists")]
    DuplicateKey(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl MutationError {
    pub fn code(&self) -> &'static str {
        match self {
            MutationError::DuplicateKey(_) => "DOCFILE_DUPLICATE_KEY",
            MutationError::Document(e) => e.code(),
        }
    }
}
