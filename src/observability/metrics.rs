//! Per-store operation counters
//!
//! - Counters only, monotonic
//! - Thread-safe via atomics, Relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one store instance.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    inserts: AtomicU64,
    updates: AtomicU64,
    /// Documents removed, not calls
    deletes: AtomicU64,
    purges: AtomicU64,
    corrupt_recoveries: AtomicU64,
    lock_timeouts: AtomicU64,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_inserts(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_purges(&self) {
        self.purges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_corrupt_recoveries(&self) {
        self.corrupt_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lock_timeouts(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
            corrupt_recoveries: self.corrupt_recoveries.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of [`StoreMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub purges: u64,
    pub corrupt_recoveries: u64,
    pub lock_timeouts: u64,
}
