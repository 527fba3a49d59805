//! Name-keyed store of data supplied before a stream connects, and the set
//! of names held by live connections.
//!
//! # Data Flow
//! ```text
//! host code ── insert/preload(name, values) ──▶ DataCache
//! handshake stage 4 ── claim(name) ──▶ refused if another live stream holds it
//!                  └── take(name) ──▶ adopted buffer (entry removed)
//!                              └──▶ None: connection allocates an empty buffer
//! connection close ── release(name)
//! ```
//!
//! # Design Decisions
//! - Injected as a trait object instead of a process-wide static
//! - Pending data is stored as plain vectors; a `FifoBuffer` is only built on
//!   `take`, so no buffer lock is ever taken while a map shard is locked
//! - `take` is a single atomic find-and-remove

use dashmap::{DashMap, DashSet};
use std::sync::Arc;

use super::buffer::FifoBuffer;

/// Store of pre-supplied data and live stream names.
pub trait StreamRegistry: Send + Sync {
    /// Remove and return the data registered under `name`, if any.
    fn take(&self, name: &str) -> Option<FifoBuffer>;

    /// Register the contents of `buffer` under `name`, replacing any previous entry.
    fn insert(&self, name: &str, buffer: FifoBuffer);

    /// Reserve `name` for a live connection. `false` if another holds it.
    fn claim(&self, name: &str) -> bool;

    /// Give up a name reserved with `claim`.
    fn release(&self, name: &str);
}

/// Default registry backed by concurrent maps.
#[derive(Debug, Clone, Default)]
pub struct DataCache {
    pending: Arc<DashMap<String, Vec<f64>>>,
    active: Arc<DashSet<String>>,
}

impl DataCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `values` to the entry for `name`, creating it if needed.
    pub fn preload(&self, name: &str, values: &[f64]) {
        self.pending
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(values);
        tracing::debug!(stream = name, added = values.len(), "Preloaded stream data");
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pending.contains_key(name)
    }

    /// Number of values waiting under `name`.
    pub fn pending(&self, name: &str) -> usize {
        self.pending.get(name).map(|entry| entry.len()).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl StreamRegistry for DataCache {
    fn take(&self, name: &str) -> Option<FifoBuffer> {
        self.pending
            .remove(name)
            .map(|(_, values)| FifoBuffer::from_values(values))
    }

    fn insert(&self, name: &str, buffer: FifoBuffer) {
        let values = buffer.take_all();
        self.pending.insert(name.to_string(), values);
    }

    fn claim(&self, name: &str) -> bool {
        self.active.insert(name.to_string())
    }

    fn release(&self, name: &str) {
        self.active.remove(name);
    }
}
