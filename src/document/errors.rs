//! Record model validation errors

use thiserror::Error;

/// Result type for record model validation
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Validation failures for documents, patches and queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid document id: {0}")]
    InvalidId(String),

    #[error("duplicate document id in set: {0}")]
    DuplicateId(String),

    #[error("reserved field cannot be patched: {0}")]
    ReservedField(String),

    #[error("query must name exactly one field, got {0}")]
    InvalidQuery(usize),
}

impl DocumentError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DocumentError::NotAnObject(_) | DocumentError::InvalidId(_) => {
                "DOCFILE_INVALID_DOCUMENT"
            }
            DocumentError::DuplicateId(_) => "DOCFILE_DUPLICATE_KEY",
            DocumentError::ReservedField(_) => "DOCFILE_RESERVED_FIELD",
            DocumentError::InvalidQuery(_) => "DOCFILE_INVALID_QUERY",
        }
    }
}

/// JSON type name, for error messages
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
