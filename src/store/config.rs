//! Store configuration
//!
//! Loaded from a JSON file or built in code. Optional fields fall back to
//! serde defaults; `validate()` runs on every load and on `Store::new`.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;

/// Configuration for one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the store file (required)
    pub root_dir: PathBuf,

    /// Store name (required). The file is `<root_dir>/.<name>.json`
    pub name: String,

    /// Bound on the exclusive-lock wait (optional, default 5s)
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Poll interval for the cross-process lock (optional, default 10ms)
    #[serde(default = "default_lock_retry_interval_ms")]
    pub lock_retry_interval_ms: u64,

    /// Pretty-print the store file (optional, default true)
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}
fn default_lock_retry_interval_ms() -> u64 {
    10
}
fn default_pretty() -> bool {
    true
}

impl StoreConfig {
    pub fn new(root_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            name: name.into(),
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_retry_interval_ms: default_lock_retry_interval_ms(),
            pretty: default_pretty(),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = duration_to_ms(timeout);
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval_ms = duration_to_ms(interval);
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: StoreConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name)?;

        if self.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("root_dir must not be empty".into()));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.lock_retry_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock_retry_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        store_path(&self.root_dir, &self.name)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_interval_ms)
    }
}

/// Backing file path for a store: `<root_dir>/.<name>.json`
pub fn store_path(root_dir: &Path, name: &str) -> PathBuf {
    root_dir.join(format!(".{name}.json"))
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid("name must not be empty".into()));
    }
    if name.starts_with('.') {
        return Err(ConfigError::Invalid(format!(
            "name must not start with '.': {name}"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ConfigError::Invalid(format!(
            "name must not contain path separators: {name}"
        )));
    }
    // Anything else that would not land as one plain file name
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ConfigError::Invalid(format!("invalid store name: {name}"))),
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
