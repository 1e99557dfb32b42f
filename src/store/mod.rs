//! Store controller for docfile
//!
//! The public face of the crate: configuration, lifecycle and the six
//! document operations.
//!
//! # Usage
//!
//! ```no_run
//! use docfile::{Query, Store, StoreConfig};
//! use serde_json::json;
//!
//! let store = Store::open(StoreConfig::new("/var/lib/app", "users"))?;
//! let doc = store.insert_one(json!({"name": "a"}))?;
//! store.find_one_and_update(&Query::by_id(doc.id()), json!({"name": "b"}))?;
//! # Ok::<(), docfile::StoreError>(())
//! ```

mod config;
mod controller;
mod errors;
mod state;

pub use config::{store_path, StoreConfig};
pub use controller::Store;
pub use errors::{ConfigError, StoreError, StoreResult};
pub use state::StoreState;
