//! Store controller
//!
//! Sequences every public operation:
//!
//! - Reads (`get_all`, `find_one`, `count`): load, no lock. Atomic replace
//!   guarantees a fully written snapshot.
//! - Writes (`insert_one`, `find_one_and_update`, `delete_many`,
//!   `purge_all`): one critical section under the path lock,
//!   load -> mutate -> save.
//!
//! Writes that change nothing skip the save.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use super::config::StoreConfig;
use super::errors::{StoreError, StoreResult};
use super::state::StoreState;
use crate::codec::{LoadStatus, StoreFile};
use crate::crash_point::{maybe_crash, points};
use crate::document::{Document, DocumentSet, NewDocument, Patch, Query};
use crate::lock::{LockError, PathLock, PathLockGuard};
use crate::mutation;
use crate::observability::{log_event_with_fields, Event, MetricsSnapshot, StoreMetrics};

/// An embedded document store backed by one JSON file.
///
/// `Store` is `Send + Sync`; share it across threads with `Arc`. Separate
/// `Store` values, in this process or another, may point at the same file.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    file: StoreFile,
    lock: PathLock,
    state: Mutex<StoreState>,
    metrics: StoreMetrics,
}

impl Store {
    /// Build an uninitialized store. Does not touch the filesystem.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let path = config.store_path();
        let file = StoreFile::new(&path, config.pretty);
        let lock = PathLock::for_target(&path);

        Ok(Self {
            config,
            file,
            lock,
            state: Mutex::new(StoreState::Uninitialized),
            metrics: StoreMetrics::new(),
        })
    }

    /// Build a store and create its backing file if absent.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config)?;
        store.ensure_ready()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn state(&self) -> StoreState {
        *self.state.lock()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ==================== Reads ====================

    /// Every stored document, in insertion order.
    pub fn get_all(&self) -> StoreResult<DocumentSet> {
        self.ensure_ready()?;
        self.load()
    }

    /// First document matching `query`.
    pub fn find_one(&self, query: &Query) -> StoreResult<Option<Document>> {
        let documents = self.get_all()?;
        Ok(mutation::find_one(&documents, query).cloned())
    }

    pub fn count(&self) -> StoreResult<usize> {
        self.get_all().map(|documents| documents.len())
    }

    // ==================== Writes ====================

    /// Insert one document and return it as stored.
    ///
    /// The store assigns a UUID v4 id unless `document` carries one, and
    /// stamps `createdAt` and `updatedAt`.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if the id is taken; the file is not written.
    pub fn insert_one(&self, document: Value) -> StoreResult<Document> {
        let candidate = NewDocument::from_value(document)?;

        let inserted = self.write(|documents| {
            let inserted = mutation::insert(documents, candidate, Utc::now())?;
            Ok((inserted, true))
        })?;

        self.metrics.increment_inserts();
        log_event_with_fields(
            Event::DocumentInserted,
            &[("id", inserted.id()), ("store", self.config.name.as_str())],
        );
        Ok(inserted)
    }

    /// Patch the first document matching `query`.
    ///
    /// Returns the document as it was before the patch, or `None` when
    /// nothing matches (no write).
    pub fn find_one_and_update(&self, query: &Query, patch: Value) -> StoreResult<Option<Document>> {
        let patch = Patch::from_value(patch)?;

        let previous = self.write(|documents| {
            let previous = mutation::update_one(documents, query, &patch, Utc::now());
            let changed = previous.is_some();
            Ok((previous, changed))
        })?;

        if let Some(document) = &previous {
            self.metrics.increment_updates();
            log_event_with_fields(
                Event::DocumentUpdated,
                &[("id", document.id()), ("store", self.config.name.as_str())],
            );
        }
        Ok(previous)
    }

    /// Delete every document matching `query`; returns the survivors.
    pub fn delete_many(&self, query: &Query) -> StoreResult<DocumentSet> {
        let (survivors, removed) = self.write(|documents| {
            let removed = mutation::delete_matching(documents, query);
            Ok(((documents.clone(), removed), removed > 0))
        })?;

        if removed > 0 {
            self.metrics.add_deletes(removed as u64);
            let count = removed.to_string();
            log_event_with_fields(
                Event::DocumentsDeleted,
                &[("count", count.as_str()), ("store", self.config.name.as_str())],
            );
        }
        Ok(survivors)
    }

    /// Delete the backing file. The next operation recreates it empty.
    ///
    /// Idempotent. The `.lock` sidecar is left in place.
    pub fn purge_all(&self) -> StoreResult<()> {
        self.ensure_ready()?;

        let existed = {
            let _guard = self.acquire_lock()?;
            let existed = self.file.remove()?;
            *self.state.lock() = StoreState::Purged;
            existed
        };

        self.metrics.increment_purges();
        let path = self.path_string();
        log_event_with_fields(
            Event::StorePurged,
            &[
                ("path", path.as_str()),
                ("existed", if existed { "true" } else { "false" }),
            ],
        );
        Ok(())
    }

    // ==================== Internals ====================

    /// Create the backing file if needed and move to `Ready`.
    fn ensure_ready(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.is_ready() {
            return Ok(());
        }

        let created = self.file.ensure_exists()?;
        let path = self.path_string();
        if created {
            log_event_with_fields(Event::StoreFileCreated, &[("path", path.as_str())]);
        }

        let previous = *state;
        *state = StoreState::Ready;
        log_event_with_fields(
            Event::StoreOpened,
            &[("path", path.as_str()), ("from", previous.as_str())],
        );
        Ok(())
    }

    /// Run `mutate` inside the critical section.
    ///
    /// `mutate` returns its result and whether the set changed; unchanged
    /// sets are not written back. An `Err` from `mutate` skips the save.
    fn write<T, F>(&self, mutate: F) -> StoreResult<T>
    where
        F: FnOnce(&mut DocumentSet) -> StoreResult<(T, bool)>,
    {
        self.ensure_ready()?;
        let _guard = self.acquire_lock()?;
        maybe_crash(points::STORE_AFTER_LOCK);

        let mut documents = self.load()?;
        let (result, changed) = mutate(&mut documents)?;
        if changed {
            self.save(&documents)?;
            // A purge that ran between ensure_ready and the lock left Purged
            *self.state.lock() = StoreState::Ready;
        }
        Ok(result)
    }

    fn acquire_lock(&self) -> StoreResult<PathLockGuard> {
        self.lock
            .acquire(
                self.config.lock_timeout(),
                self.config.lock_retry_interval(),
            )
            .map_err(|e| {
                if let LockError::Timeout { path, waited } = &e {
                    self.metrics.increment_lock_timeouts();
                    let path = path.display().to_string();
                    let waited = waited.as_millis().to_string();
                    log_event_with_fields(
                        Event::LockTimeout,
                        &[("path", path.as_str()), ("waited_ms", waited.as_str())],
                    );
                }
                StoreError::from(e)
            })
    }

    fn load(&self) -> StoreResult<DocumentSet> {
        let (documents, status) = self.file.load_with_status()?;
        if let LoadStatus::Recovered(_) = status {
            self.metrics.increment_corrupt_recoveries();
        }
        Ok(documents)
    }

    fn save(&self, documents: &DocumentSet) -> StoreResult<()> {
        self.file.save(documents).map_err(|e| {
            let path = self.path_string();
            let reason = e.to_string();
            log_event_with_fields(
                Event::WriteFailed,
                &[
                    ("path", path.as_str()),
                    ("code", e.code()),
                    ("error", reason.as_str()),
                ],
            );
            StoreError::from(e)
        })
    }

    fn path_string(&self) -> String {
        self.file.path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StoreConfig {
        StoreConfig::new(dir.path(), "test")
    }

    fn open(dir: &TempDir) -> Store {
        Store::open(config(dir)).unwrap()
    }

    #[test]
    fn test_new_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(config(&dir)).unwrap();

        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let err = Store::new(StoreConfig::new(dir.path(), "")).unwrap_err();
        assert_eq!(err.code(), "DOCFILE_CONFIG_ERROR");
    }

    #[test]
    fn test_open_creates_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        assert_eq!(store.state(), StoreState::Ready);
        assert_eq!(store.path(), dir.path().join(".test.json"));
        assert_eq!(fs::read(store.path()).unwrap().len(), 0);
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_open_keeps_existing_contents() {
        let dir = TempDir::new().unwrap();
        open(&dir).insert_one(json!({"id": "keep"})).unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_lazy_init_on_first_operation() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(config(&dir)).unwrap();

        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.path().exists());
    }

    #[test]
    fn test_insert_assigns_id_and_timestamps() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let doc = store.insert_one(json!({"name": "a"})).unwrap();
        assert!(!doc.id().is_empty());
        assert_eq!(doc.created_at(), doc.updated_at());
        assert_eq!(doc.fields().get("name"), Some(&json!("a")));

        let all = store.get_all().unwrap();
        assert_eq!(all.as_slice(), &[doc]);
    }

    #[test]
    fn test_insert_duplicate_id_leaves_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.insert_one(json!({"id": "x", "v": 1})).unwrap();
        let before = fs::read(store.path()).unwrap();

        let err = store.insert_one(json!({"id": "x", "v": 2})).unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert_eq!(store.metrics().inserts, 1);
    }

    #[test]
    fn test_insert_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let err = store.insert_one(json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), "DOCFILE_INVALID_DOCUMENT");
        assert_eq!(fs::read(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_update_returns_previous_and_persists_patch() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let inserted = store.insert_one(json!({"name": "a", "n": 1})).unwrap();

        let previous = store
            .find_one_and_update(&Query::eq("name", "a"), json!({"name": "b"}))
            .unwrap()
            .unwrap();
        assert_eq!(previous, inserted);

        let current = store.find_one(&Query::by_id(inserted.id())).unwrap().unwrap();
        assert_eq!(current.fields().get("name"), Some(&json!("b")));
        assert_eq!(current.fields().get("n"), Some(&json!(1)));
        assert_eq!(current.created_at(), inserted.created_at());
        assert!(current.updated_at() >= inserted.updated_at());
    }

    #[test]
    fn test_update_without_match_does_not_write() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let result = store
            .find_one_and_update(&Query::eq("name", "nobody"), json!({"x": 1}))
            .unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read(store.path()).unwrap().len(), 0);
        assert_eq!(store.metrics().updates, 0);
    }

    #[test]
    fn test_update_rejects_reserved_field() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let doc = store.insert_one(json!({"name": "a"})).unwrap();

        let err = store
            .find_one_and_update(&Query::by_id(doc.id()), json!({"id": "other"}))
            .unwrap_err();
        assert_eq!(err.code(), "DOCFILE_RESERVED_FIELD");
        assert!(store.find_one(&Query::by_id(doc.id())).unwrap().is_some());
    }

    #[test]
    fn test_delete_many_returns_survivors() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.insert_one(json!({"id": "1", "k": "x"})).unwrap();
        store.insert_one(json!({"id": "2", "k": "y"})).unwrap();
        store.insert_one(json!({"id": "3", "k": "x"})).unwrap();

        let survivors = store.delete_many(&Query::eq("k", "x")).unwrap();
        let ids: Vec<_> = survivors.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["2"]);
        assert_eq!(store.get_all().unwrap(), survivors);
        assert_eq!(store.metrics().deletes, 2);
    }

    #[test]
    fn test_delete_without_match_does_not_write() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        let survivors = store.delete_many(&Query::eq("k", "x")).unwrap();
        assert!(survivors.is_empty());
        assert_eq!(fs::read(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_purge_state_transitions() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(config(&dir)).unwrap();
        store.insert_one(json!({"name": "a"})).unwrap();

        store.purge_all().unwrap();
        assert_eq!(store.state(), StoreState::Purged);
        assert!(!store.path().exists());

        // Lazily recreated, empty
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.state(), StoreState::Ready);
        assert!(store.path().exists());
    }

    #[test]
    fn test_purge_is_idempotent_and_keeps_lock_file() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.insert_one(json!({"name": "a"})).unwrap();

        store.purge_all().unwrap();
        store.purge_all().unwrap();

        assert_eq!(store.metrics().purges, 2);
        assert!(dir.path().join(".test.json.lock").exists());
    }

    #[test]
    fn test_write_after_interleaved_purge_reports_ready() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        // Purge lands after this write passed ensure_ready
        store
            .write(|documents| {
                *store.state.lock() = StoreState::Purged;
                let inserted = mutation::insert(
                    documents,
                    NewDocument::from_value(json!({"id": "late"}))?,
                    Utc::now(),
                )?;
                Ok((inserted, true))
            })
            .unwrap();

        assert!(store.path().exists());
        assert_eq!(store.state(), StoreState::Ready);
    }

    #[test]
    fn test_noop_write_after_purge_keeps_purged() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .write(|_| {
                *store.state.lock() = StoreState::Purged;
                Ok(((), false))
            })
            .unwrap();

        assert_eq!(store.state(), StoreState::Purged);
    }

    #[test]
    fn test_unreadable_store_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(config(&dir)).unwrap();
        fs::create_dir(store.path()).unwrap();

        let err = store.get_all().unwrap_err();
        assert_eq!(err.code(), "DOCFILE_IO_ERROR");
        assert!(store.insert_one(json!({"id": "x"})).is_err());
    }

    #[test]
    fn test_corrupt_file_reads_empty_and_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        fs::write(store.path(), b"{not json").unwrap();

        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.metrics().corrupt_recoveries, 1);

        store.insert_one(json!({"id": "fresh"})).unwrap();
        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_id("fresh"));
    }

    #[test]
    fn test_lock_timeout_when_lock_held() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(
            config(&dir)
                .with_lock_timeout(Duration::from_millis(50))
                .with_lock_retry_interval(Duration::from_millis(5)),
        )
        .unwrap();

        let holder = PathLock::for_target(store.path());
        let _guard = holder
            .acquire(Duration::from_secs(1), Duration::from_millis(1))
            .unwrap();

        let err = store.insert_one(json!({"name": "a"})).unwrap_err();
        assert!(err.is_lock_timeout());
        assert_eq!(store.metrics().lock_timeouts, 1);
        assert_eq!(fs::read(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_reads_do_not_take_lock() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.insert_one(json!({"id": "r"})).unwrap();

        let holder = PathLock::for_target(store.path());
        let _guard = holder
            .acquire(Duration::from_secs(1), Duration::from_millis(1))
            .unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert!(store.find_one(&Query::by_id("r")).unwrap().is_some());
    }

    #[test]
    fn test_compact_output() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(config(&dir).with_pretty(false)).unwrap();
        store.insert_one(json!({"id": "c"})).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.trim_end().lines().count(), 1);
    }
}
