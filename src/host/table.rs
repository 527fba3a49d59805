//! Live connection table and the host-side data API.
//!
//! # Design Decisions
//! - Entries live exactly as long as their worker
//! - Values a connection still holds when its worker exits are parked by
//!   stream name, so closed connections never pile up in the table

use dashmap::DashMap;
use std::sync::Arc;

use crate::net::connection::ConnectionId;
use crate::stream::{DataCache, StreamHandle};

/// Handles of every connection whose worker is still running, plus values
/// left behind by connections that have exited.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTable {
    inner: Arc<DashMap<ConnectionId, StreamHandle>>,
    parked: Arc<DashMap<String, Vec<f64>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: StreamHandle) {
        self.inner.insert(handle.id(), handle);
    }

    /// The established, healthy connection negotiated under `name`.
    ///
    /// Names are unique among established connections, so there is at most one.
    pub fn find(&self, name: &str) -> Option<StreamHandle> {
        self.inner
            .iter()
            .find(|entry| {
                let handle = entry.value();
                handle.is_established() && !handle.is_failed() && handle.name() == Some(name)
            })
            .map(|entry| entry.value().clone())
    }

    /// Drop the entry of a worker that has exited. Anything it still buffers
    /// is parked under its stream name.
    pub fn retire(&self, id: ConnectionId) {
        let Some((_, handle)) = self.inner.remove(&id) else {
            return;
        };
        let Some(name) = handle.name() else {
            return;
        };
        let leftover = handle.take_all();
        if leftover.is_empty() {
            return;
        }
        tracing::debug!(
            connection_id = %id,
            stream = name,
            values = leftover.len(),
            "Parking undrained values"
        );
        self.parked
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(&leftover);
    }

    /// Remove and return values parked under `name`.
    pub fn take_parked(&self, name: &str) -> Vec<f64> {
        self.parked
            .remove(name)
            .map(|(_, values)| values)
            .unwrap_or_default()
    }

    pub fn handles(&self) -> Vec<StreamHandle> {
        self.inner.iter().map(|entry| entry.value().clone()).collect()
    }
}

/// Where `HostHandle::add_data` put the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDestination {
    /// Appended to a live connection's buffer.
    Connection(ConnectionId),
    /// Stored in the registry for a stream that has not connected yet.
    Registry,
}

/// Computation-side entry point: feed and drain streams by name.
#[derive(Debug, Clone)]
pub struct HostHandle {
    table: ConnectionTable,
    cache: DataCache,
}

impl HostHandle {
    pub fn new(table: ConnectionTable, cache: DataCache) -> Self {
        Self { table, cache }
    }

    pub fn connections(&self) -> Vec<StreamHandle> {
        self.table.handles()
    }

    pub fn find(&self, name: &str) -> Option<StreamHandle> {
        self.table.find(name)
    }

    /// Queue `values` for stream `name`: on its live connection if there is
    /// one, otherwise in the registry for adoption at handshake.
    pub fn add_data(&self, name: &str, values: &[f64]) -> DataDestination {
        if let Some(handle) = self.table.find(name) {
            if handle.append_all(values) {
                return DataDestination::Connection(handle.id());
            }
        }
        self.cache.preload(name, values);
        DataDestination::Registry
    }

    /// Drain everything buffered for stream `name`: values parked by
    /// connections that have exited first, then the live connection's.
    pub fn take_data(&self, name: &str) -> Vec<f64> {
        let mut values = self.table.take_parked(name);
        if let Some(handle) = self.table.find(name) {
            values.extend(handle.take_all());
        }
        values
    }

    pub fn registry(&self) -> &DataCache {
        &self.cache
    }

    /// Connections currently established.
    pub fn active_count(&self) -> usize {
        self.table
            .handles()
            .iter()
            .filter(|handle| handle.is_established())
            .count()
    }
}
