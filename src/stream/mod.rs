//! Per-connection protocol engine.
//!
//! # Data Flow
//! ```text
//! accepted socket
//!     → transport.rs  (Transport seam, io result classification)
//!     → handshake.rs  (direction → data type → data size → name)
//!         → registry.rs (adopt pre-supplied buffer by name)
//!     → connection.rs (tick: dispatch to steady-state read or write)
//!         → steady.rs  (one cycle per tick, ack-gated)
//!         → buffer.rs  (FIFO shared with the computation side)
//!     → handle.rs     (accessors used by the computation side)
//!
//! Connection States:
//!     Handshaking → Established → Finished
//!                 ↘ Failed (terminal, also finished)
//! ```
//!
//! # Design Decisions
//! - The worker thread owns the socket and scratch memory; only the FIFO and
//!   status flags are shared, behind an `Arc`
//! - Silence is the only timeout: `stall_limit` consecutive zero-byte ticks
//! - Network calls never run while the FIFO lock is held

pub mod buffer;
pub mod connection;
pub mod error;
pub mod handle;
pub mod handshake;
pub mod registry;
pub mod stall;
pub mod steady;
pub mod transport;

pub use buffer::FifoBuffer;
pub use connection::StreamConnection;
pub use error::{BufferError, HandshakeError, HandshakeStage, SessionError};
pub use handle::{StreamHandle, StreamParams, StreamState};
pub use registry::{DataCache, StreamRegistry};
pub use transport::Transport;

use crate::protocol::{MAX_NAME_LEN, NO_DATA_MAX_COUNT};

/// Result of one tick of input/output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing terminal happened; tick again.
    Continue,
    /// The session ended gracefully.
    Finished,
    /// A protocol violation or unrecoverable I/O error ended the session.
    Failed,
}

impl TickOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TickOutcome::Continue)
    }
}

/// Limits applied during negotiation and the steady state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolLimits {
    /// Consecutive zero-byte ticks before a stage gives up.
    pub stall_limit: u32,
    /// Longest accepted stream name, in bytes.
    pub max_name_len: u32,
    /// Largest accepted number of values per cycle.
    pub max_data_size: u32,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            stall_limit: NO_DATA_MAX_COUNT,
            max_name_len: MAX_NAME_LEN,
            max_data_size: 1 << 24,
        }
    }
}
