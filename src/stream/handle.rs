//! State shared between a connection's worker and the computation side.
//!
//! # Responsibilities
//! - Publish status flags (established, failed, finished)
//! - Publish negotiated parameters once, when the handshake completes
//! - Give the computation side locked access to the FIFO
//!
//! # Design Decisions
//! - Flags are atomics; `failed` and `finished` are only ever set, never cleared
//! - Parameters and buffer live in `OnceLock`s: absent before negotiation,
//!   immutable after

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use super::buffer::FifoBuffer;
use super::error::BufferError;
use crate::net::connection::ConnectionId;
use crate::protocol::{DataType, Direction};

/// Parameters fixed by the handshake for the lifetime of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParams {
    pub name: String,
    pub direction: Direction,
    pub data_type: DataType,
    /// Values per cycle.
    pub data_size: usize,
}

/// Coarse lifecycle state, derived from the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Handshake not complete.
    Handshaking,
    /// Data may flow.
    Established,
    /// Session ended gracefully.
    Finished,
    /// Session ended on an error.
    Failed,
    /// Socket closed before the session reached a terminal state.
    Closed,
}

#[derive(Debug)]
pub(crate) struct StreamShared {
    id: ConnectionId,
    established: AtomicBool,
    failed: AtomicBool,
    finished: AtomicBool,
    closed: AtomicBool,
    params: OnceLock<StreamParams>,
    buffer: OnceLock<FifoBuffer>,
}

impl StreamShared {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            established: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            params: OnceLock::new(),
            buffer: OnceLock::new(),
        }
    }

    /// Attach buffer and parameters, then flip `established`.
    pub(crate) fn establish(&self, params: StreamParams, buffer: FifoBuffer) {
        let _ = self.buffer.set(buffer);
        let _ = self.params.set(params);
        self.established.store(true, Ordering::Release);
    }

    pub(crate) fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
        self.established.store(false, Ordering::Release);
    }

    pub(crate) fn buffer(&self) -> Option<&FifoBuffer> {
        self.buffer.get()
    }

    pub(crate) fn params(&self) -> Option<&StreamParams> {
        self.params.get()
    }

    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn is_established(&self) -> bool {
        self.established.load(Ordering::Acquire)
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Cloneable view of one connection for the computation side.
///
/// Never touches the socket. All buffer access goes through the FIFO lock.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    shared: Arc<StreamShared>,
}

impl StreamHandle {
    pub(crate) fn new(shared: Arc<StreamShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> ConnectionId {
        self.shared.id()
    }

    /// Negotiated parameters, once established.
    pub fn params(&self) -> Option<&StreamParams> {
        self.shared.params()
    }

    pub fn name(&self) -> Option<&str> {
        self.params().map(|p| p.name.as_str())
    }

    pub fn direction(&self) -> Option<Direction> {
        self.params().map(|p| p.direction)
    }

    pub fn is_established(&self) -> bool {
        self.shared.is_established()
    }

    pub fn is_failed(&self) -> bool {
        self.shared.is_failed()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.is_finished()
    }

    pub fn state(&self) -> StreamState {
        if self.is_failed() {
            StreamState::Failed
        } else if self.is_finished() {
            StreamState::Finished
        } else if self.shared.is_closed() {
            StreamState::Closed
        } else if self.is_established() {
            StreamState::Established
        } else {
            StreamState::Handshaking
        }
    }

    fn accepting(&self) -> Option<&FifoBuffer> {
        if !self.is_established() || self.is_failed() {
            return None;
        }
        self.shared.buffer()
    }

    /// Queue one value for the remote. Dropped unless established and healthy.
    pub fn append(&self, value: f64) -> bool {
        match self.accepting() {
            Some(buffer) => {
                buffer.push_back(value);
                true
            }
            None => false,
        }
    }

    /// Queue `values` in order. Dropped unless established and healthy.
    pub fn append_all(&self, values: &[f64]) -> bool {
        match self.accepting() {
            Some(buffer) => {
                buffer.extend_from_slice(values);
                true
            }
            None => false,
        }
    }

    /// Number of values currently buffered (0 before a buffer is attached).
    pub fn len(&self) -> usize {
        self.shared.buffer().map(FifoBuffer::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return the oldest buffered value.
    pub fn pop_front(&self) -> Result<f64, BufferError> {
        let buffer = self.shared.buffer().ok_or(BufferError::Detached)?;
        buffer.pop_front().ok_or(BufferError::Empty)
    }

    /// Remove and return everything buffered.
    pub fn take_all(&self) -> Vec<f64> {
        self.shared
            .buffer()
            .map(FifoBuffer::take_all)
            .unwrap_or_default()
    }
}
