//! Document, candidate and patch types
//!
//! A stored [`Document`] is an open JSON object plus three reserved fields:
//! `id`, `createdAt` and `updatedAt`. The reserved fields live in typed
//! struct fields and never appear inside the open field map, so a
//! serialized document has exactly one of each.

use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::errors::{json_type_name, DocumentError, DocumentResult};

/// Identity field name
pub const ID_FIELD: &str = "id";
/// Creation timestamp field name
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Last-update timestamp field name
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Field names owned by the store
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Returns true if `field` is one of [`RESERVED_FIELDS`]
pub fn is_reserved(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,

    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    updated_at: DateTime<Utc>,

    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Document {
    /// Build a document from an already-validated id and field map.
    pub(crate) fn new(id: String, fields: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// User fields, without the reserved ones
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a top-level field, reserved fields included.
    ///
    /// Timestamps are returned in their on-disk string form.
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        match field {
            ID_FIELD => Some(Cow::Owned(Value::String(self.id.clone()))),
            CREATED_AT_FIELD => timestamp_value(&self.created_at).map(Cow::Owned),
            UPDATED_AT_FIELD => timestamp_value(&self.updated_at).map(Cow::Owned),
            _ => self.fields.get(field).map(Cow::Borrowed),
        }
    }

    /// Merge `patch` over the user fields and refresh `updatedAt`.
    pub(crate) fn apply_patch(&mut self, patch: &Patch, now: DateTime<Utc>) {
        for (key, value) in patch.fields() {
            self.fields.insert(key.clone(), value.clone());
        }
        self.updated_at = now;
    }

    /// The full JSON object, reserved fields included
    pub fn to_value(&self) -> Value {
        // A struct of strings, timestamps and a JSON map always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn timestamp_value(ts: &DateTime<Utc>) -> Option<Value> {
    serde_json::to_value(ts).ok()
}

/// A validated insert candidate.
///
/// Carries an optional caller-supplied id and the user fields. Any
/// caller-supplied `createdAt`/`updatedAt` is dropped; the store stamps both.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    id: Option<String>,
    fields: Map<String, Value>,
}

impl NewDocument {
    /// Validate a JSON value as an insert candidate.
    ///
    /// # Errors
    ///
    /// - `NotAnObject` if `value` is not a JSON object
    /// - `InvalidId` if `id` is present but not a non-empty string
    pub fn from_value(value: Value) -> DocumentResult<Self> {
        let mut fields = match value {
            Value::Object(map) => map,
            other => return Err(DocumentError::NotAnObject(json_type_name(&other))),
        };

        let id = match fields.remove(ID_FIELD) {
            None => None,
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::String(_)) => {
                return Err(DocumentError::InvalidId("id must not be empty".into()))
            }
            Some(other) => {
                return Err(DocumentError::InvalidId(format!(
                    "id must be a string, got {}",
                    json_type_name(&other)
                )))
            }
        };

        fields.remove(CREATED_AT_FIELD);
        fields.remove(UPDATED_AT_FIELD);

        Ok(Self { id, fields })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Map<String, Value>) {
        (self.id, self.fields)
    }
}

impl TryFrom<Value> for NewDocument {
    type Error = DocumentError;

    fn try_from(value: Value) -> DocumentResult<Self> {
        Self::from_value(value)
    }
}

/// A validated update patch: a JSON object with no reserved keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    /// # Errors
    ///
    /// - `NotAnObject` if `value` is not a JSON object
    /// - `ReservedField` if it names `id`, `createdAt` or `updatedAt`
    pub fn from_value(value: Value) -> DocumentResult<Self> {
        let fields = match value {
            Value::Object(map) => map,
            other => return Err(DocumentError::NotAnObject(json_type_name(&other))),
        };

        if let Some(key) = fields.keys().find(|k| is_reserved(k)) {
            return Err(DocumentError::ReservedField(key.clone()));
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Value> for Patch {
    type Error = DocumentError;

    fn try_from(value: Value) -> DocumentResult<Self> {
        Self::from_value(value)
    }
}

/// Ordered documents with unique, non-empty ids.
///
/// Serializes as a plain JSON array; deserializing re-checks the id
/// invariants.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Document>")]
pub struct DocumentSet {
    documents: Vec<Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, checking every id is non-empty and unique.
    pub fn from_documents(documents: Vec<Document>) -> DocumentResult<Self> {
        let mut seen = HashSet::with_capacity(documents.len());
        for doc in &documents {
            if doc.id.is_empty() {
                return Err(DocumentError::InvalidId("id must not be empty".into()));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(DocumentError::DuplicateId(doc.id.clone()));
            }
        }
        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn as_slice(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.documents.iter().any(|d| d.id == id)
    }

    pub fn into_vec(self) -> Vec<Document> {
        self.documents
    }

    /// Append; caller guarantees the id is new.
    pub(crate) fn push(&mut self, document: Document) {
        debug_assert!(!self.contains_id(&document.id));
        self.documents.push(document);
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Document> {
        self.documents.get_mut(index)
    }

    pub(crate) fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Document) -> bool,
    {
        self.documents.retain(keep);
    }
}

impl Serialize for DocumentSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.documents.serialize(serializer)
    }
}

impl TryFrom<Vec<Document>> for DocumentSet {
    type Error = DocumentError;

    fn try_from(documents: Vec<Document>) -> DocumentResult<Self> {
        Self::from_documents(documents)
    }
}

impl IntoIterator for DocumentSet {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn doc(id: &str, fields: Value) -> Document {
        let Value::Object(map) = fields else {
            panic!("fields must be an object")
        };
        Document::new(id.to_string(), map, at(1_700_000_000))
    }

    #[test]
    fn test_candidate_without_id() {
        let candidate = NewDocument::from_value(json!({"name": "a"})).unwrap();
        assert_eq!(candidate.id(), None);
        assert_eq!(candidate.fields().get("name"), Some(&json!("a")));
    }

    #[test]
    fn test_candidate_keeps_supplied_id_out_of_fields() {
        let candidate = NewDocument::from_value(json!({"id": "u1", "name": "a"})).unwrap();
        assert_eq!(candidate.id(), Some("u1"));
        assert!(!candidate.fields().contains_key("id"));
    }

    #[test]
    fn test_candidate_drops_caller_timestamps() {
        let candidate = NewDocument::from_value(json!({
            "name": "a",
            "createdAt": "1999-01-01T00:00:00Z",
            "updatedAt": 5
        }))
        .unwrap();
        assert_eq!(candidate.fields().len(), 1);
    }

    #[test]
    fn test_candidate_rejects_bad_ids() {
        assert!(matches!(
            NewDocument::from_value(json!({"id": ""})),
            Err(DocumentError::InvalidId(_))
        ));
        assert!(matches!(
            NewDocument::from_value(json!({"id": 7})),
            Err(DocumentError::InvalidId(_))
        ));
        assert!(matches!(
            NewDocument::from_value(json!({"id": null})),
            Err(DocumentError::InvalidId(_))
        ));
    }

    #[test]
    fn test_candidate_must_be_object() {
        assert_eq!(
            NewDocument::from_value(json!([1, 2])),
            Err(DocumentError::NotAnObject("array"))
        );
    }

    #[test]
    fn test_patch_rejects_reserved_fields() {
        for key in RESERVED_FIELDS {
            let mut map = Map::new();
            map.insert(key.to_string(), json!("x"));
            assert_eq!(
                Patch::from_value(Value::Object(map)),
                Err(DocumentError::ReservedField(key.to_string()))
            );
        }
    }

    #[test]
    fn test_apply_patch_overwrites_and_retains() {
        let mut d = doc("1", json!({"name": "a", "age": 3}));
        let patch = Patch::from_value(json!({"name": "b", "tag": true})).unwrap();
        d.apply_patch(&patch, at(1_700_000_100));

        assert_eq!(d.fields().get("name"), Some(&json!("b")));
        assert_eq!(d.fields().get("age"), Some(&json!(3)));
        assert_eq!(d.fields().get("tag"), Some(&json!(true)));
        assert_eq!(d.created_at(), at(1_700_000_000));
        assert_eq!(d.updated_at(), at(1_700_000_100));
    }

    #[test]
    fn test_serialized_document_has_reserved_fields_once() {
        let d = doc("abc", json!({"name": "a"}));
        let value = d.to_value();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 4);
        assert_eq!(obj["id"], json!("abc"));
        assert_eq!(obj["createdAt"], json!("2023-11-14T22:13:20Z"));
        assert_eq!(obj["name"], json!("a"));
    }

    #[test]
    fn test_get_reserved_fields_in_disk_form() {
        let d = doc("abc", json!({}));
        assert_eq!(d.get("id").unwrap().as_ref(), &json!("abc"));
        assert_eq!(
            d.get("updatedAt").unwrap().as_ref(),
            &json!("2023-11-14T22:13:20Z")
        );
        assert!(d.get("missing").is_none());
    }

    #[test]
    fn test_document_deserializes_nested_fields() {
        let raw = json!({
            "id": "x",
            "createdAt": "2024-01-01T00:00:00.123456789Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "profile": {"tags": ["a", "b"], "score": 1.5}
        });
        let d: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(d.id(), "x");
        assert_eq!(d.fields().get("profile").unwrap()["score"], json!(1.5));
        assert_eq!(d.to_value(), raw);
    }

    #[test]
    fn test_set_rejects_duplicate_ids() {
        let result = DocumentSet::from_documents(vec![
            doc("1", json!({})),
            doc("2", json!({})),
            doc("1", json!({})),
        ]);
        assert_eq!(result, Err(DocumentError::DuplicateId("1".into())));
    }

    #[test]
    fn test_set_rejects_empty_id_on_decode() {
        let raw = json!([{
            "id": "",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }]);
        assert!(serde_json::from_value::<DocumentSet>(raw).is_err());
    }

    #[test]
    fn test_set_preserves_order() {
        let set = DocumentSet::from_documents(vec![
            doc("c", json!({})),
            doc("a", json!({})),
            doc("b", json!({})),
        ])
        .unwrap();
        let ids: Vec<&str> = set.iter().map(Document::id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(set.contains_id("a"));
        assert!(!set.contains_id("z"));
    }
}
