//! On-disk store file
//!
//! Format: one UTF-8 JSON object, `{"documents": [ ... ]}`.
//!
//! Writes replace the whole file atomically:
//! 1. Write `<path>.tmp`
//! 2. fsync the temp file (durability)
//! 3. Rename temp over `<path>` (atomicity)
//! 4. fsync the parent directory so the rename survives power loss
//!
//! A reader therefore sees either the old file or the new one, never a mix.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CodecError, CodecResult};
use crate::crash_point::{maybe_crash, points};
use crate::document::DocumentSet;
use crate::observability::{log_event_with_fields, Event};

/// Top-level key holding the document array
pub const DOCUMENTS_KEY: &str = "documents";

#[derive(Serialize)]
struct FileBodyRef<'a> {
    documents: &'a DocumentSet,
}

#[derive(Deserialize)]
struct FileBody {
    documents: DocumentSet,
}

/// Serialize a document set into store file bytes.
pub fn encode(documents: &DocumentSet, pretty: bool) -> CodecResult<Vec<u8>> {
    let body = FileBodyRef { documents };
    let mut bytes = if pretty {
        serde_json::to_vec_pretty(&body)
    } else {
        serde_json::to_vec(&body)
    }
    .map_err(CodecError::Encode)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Strictly parse store file bytes.
///
/// Rejects malformed JSON, a missing `documents` key, and documents that
/// break the id invariants.
pub fn decode(bytes: &[u8]) -> CodecResult<DocumentSet> {
    serde_json::from_slice::<FileBody>(bytes)
        .map(|body| body.documents)
        .map_err(|e| CodecError::Corrupt(e.to_string()))
}

/// What [`StoreFile::load_with_status`] found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No file at the path
    Missing,
    /// File present but empty or whitespace
    Empty,
    /// File decoded successfully
    Loaded,
    /// File failed to decode and was read as empty
    Recovered(String),
}

/// Handle on one store file and its temp sibling.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
    temp_path: PathBuf,
    pretty: bool,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>, pretty: bool) -> Self {
        let path = path.into();
        let temp_path = sibling_with_suffix(&path, ".tmp");
        Self {
            path,
            temp_path,
            pretty,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create an empty file if none exists. Never truncates.
    ///
    /// Returns `true` if this call created the file.
    pub fn ensure_exists(&self) -> CodecResult<bool> {
        create_parent_dir(&self.path)?;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(CodecError::io("failed to create store file", &self.path, e)),
        }
    }

    /// Read the whole document set.
    ///
    /// Missing, empty and undecodable files all read as an empty set. Other
    /// read errors are returned.
    pub fn load(&self) -> CodecResult<DocumentSet> {
        self.load_with_status().map(|(documents, _)| documents)
    }

    /// Like [`load`](Self::load), also reporting what was found.
    ///
    /// A decode failure is logged as `CORRUPT_FILE_RECOVERED`.
    pub fn load_with_status(&self) -> CodecResult<(DocumentSet, LoadStatus)> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok((DocumentSet::new(), LoadStatus::Missing))
            }
            Err(e) => return Err(CodecError::io("failed to read store file", &self.path, e)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok((DocumentSet::new(), LoadStatus::Empty));
        }

        match decode(&bytes) {
            Ok(documents) => Ok((documents, LoadStatus::Loaded)),
            Err(err) => {
                let reason = err.to_string();
                let path = self.path.display().to_string();
                let size = bytes.len().to_string();
                log_event_with_fields(
                    Event::CorruptFileRecovered,
                    &[
                        ("path", path.as_str()),
                        ("reason", reason.as_str()),
                        ("bytes", size.as_str()),
                    ],
                );
                Ok((DocumentSet::new(), LoadStatus::Recovered(reason)))
            }
        }
    }

    /// Atomically replace the file with `documents`.
    pub fn save(&self, documents: &DocumentSet) -> CodecResult<()> {
        maybe_crash(points::CODEC_BEFORE_TEMP_WRITE);

        let bytes = encode(documents, self.pretty)?;
        create_parent_dir(&self.path)?;

        if let Err(e) = self.write_temp(&bytes) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e);
        }

        maybe_crash(points::CODEC_BEFORE_RENAME);

        fs::rename(&self.temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&self.temp_path);
            CodecError::io("failed to rename temp file onto", &self.path, e)
        })?;

        maybe_crash(points::CODEC_AFTER_RENAME);

        sync_parent_dir(&self.path);
        Ok(())
    }

    /// Delete the file and any leftover temp file.
    ///
    /// Returns `true` if the store file existed.
    pub fn remove(&self) -> CodecResult<bool> {
        let existed = match fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(CodecError::io("failed to remove store file", &self.path, e)),
        };

        match fs::remove_file(&self.temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CodecError::io(
                    "failed to remove temp file",
                    &self.temp_path,
                    e,
                ))
            }
        }

        sync_parent_dir(&self.path);
        Ok(existed)
    }

    fn write_temp(&self, bytes: &[u8]) -> CodecResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.temp_path)
            .map_err(|e| CodecError::io("failed to create temp file", &self.temp_path, e))?;

        file.write_all(bytes)
            .map_err(|e| CodecError::io("failed to write temp file", &self.temp_path, e))?;

        file.sync_all()
            .map_err(|e| CodecError::io("failed to fsync temp file", &self.temp_path, e))
    }
}

/// `path` with `suffix` appended to its file name
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn create_parent_dir(path: &Path) -> CodecResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| CodecError::io("failed to create directory", parent, e)),
        _ => Ok(()),
    }
}

fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}
