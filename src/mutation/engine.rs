//! Query matching and CRUD transformations over a [`DocumentSet`]
//!
//! Every function here is I/O-free. Fallible operations validate before
//! touching the set, so an `Err` always leaves the set unchanged. The clock
//! is passed in as `now`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{MutationError, MutationResult};
use crate::document::{Document, DocumentSet, NewDocument, Patch, Query};

/// First document, in set order, matching `query`
pub fn find_one<'a>(documents: &'a DocumentSet, query: &Query) -> Option<&'a Document> {
    documents.iter().find(|doc| query.matches(doc))
}

/// Position of the first document matching `query`
pub fn position(documents: &DocumentSet, query: &Query) -> Option<usize> {
    documents.iter().position(|doc| query.matches(doc))
}

/// Every document that does NOT match `query`, in order
pub fn filter_out(documents: &DocumentSet, query: &Query) -> DocumentSet {
    let mut survivors = documents.clone();
    survivors.retain(|doc| !query.matches(doc));
    survivors
}

/// Append a new document.
///
/// Uses the candidate's id when present, otherwise a fresh UUID v4.
/// Stamps `createdAt` and `updatedAt` with `now`.
///
/// # Errors
///
/// `DuplicateKey` if the candidate's id already exists.
pub fn insert(
    documents: &mut DocumentSet,
    candidate: NewDocument,
    now: DateTime<Utc>,
) -> MutationResult<Document> {
    let (id, fields) = candidate.into_parts();

    let id = match id {
        Some(id) if documents.contains_id(&id) => return Err(MutationError::DuplicateKey(id)),
        Some(id) => id,
        None => generate_id(documents),
    };

    let document = Document::new(id, fields, now);
    documents.push(document.clone());
    Ok(document)
}

/// Patch the first document matching `query` in place.
///
/// Returns the document as it was before the patch, or `None` (set
/// untouched) if nothing matches. The document keeps its position.
pub fn update_one(
    documents: &mut DocumentSet,
    query: &Query,
    patch: &Patch,
    now: DateTime<Utc>,
) -> Option<Document> {
    let index = position(documents, query)?;
    let target = documents.get_mut(index)?;
    let previous = target.clone();
    target.apply_patch(patch, now);
    Some(previous)
}

/// Remove every document matching `query`; returns how many were removed.
pub fn delete_matching(documents: &mut DocumentSet, query: &Query) -> usize {
    let before = documents.len();
    documents.retain(|doc| !query.matches(doc));
    before - documents.len()
}

fn generate_id(documents: &DocumentSet) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !documents.contains_id(&id) {
            return id;
        }
    }
}
