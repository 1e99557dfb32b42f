//! Crash point injection for testing durability
//!
//! A crash point is enabled via the `DOCFILE_CRASH_POINT` environment
//! variable. When the named point is reached the process terminates via
//! `std::process::abort()`: no cleanup, no unwinding, no catching.
//!
//! # Usage
//!
//! ```ignore
//! use docfile::crash_point::{maybe_crash, points};
//!
//! maybe_crash(points::CODEC_BEFORE_RENAME);
//! ```
//!
//! ```bash
//! DOCFILE_CRASH_POINT=codec_before_rename cargo test
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point
pub const CRASH_POINT_ENV: &str = "DOCFILE_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `DOCFILE_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
///
/// No-op when `DOCFILE_CRASH_POINT` is unset or names another point.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    /// Before the temp file is created
    pub const CODEC_BEFORE_TEMP_WRITE: &str = "codec_before_temp_write";
    /// Temp file written and fsynced, target untouched
    pub const CODEC_BEFORE_RENAME: &str = "codec_before_rename";
    /// Rename done, directory not yet fsynced
    pub const CODEC_AFTER_RENAME: &str = "codec_after_rename";

    /// Exclusive lock held, nothing loaded yet
    pub const STORE_AFTER_LOCK: &str = "store_after_lock";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            CODEC_BEFORE_TEMP_WRITE,
            CODEC_BEFORE_RENAME,
            CODEC_AFTER_RENAME,
            STORE_AFTER_LOCK,
        ]
    }
}
