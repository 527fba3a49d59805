//! Error types for the protocol engine.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::protocol::DataType;

/// Handshake stage, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Direction,
    DataType,
    DataSize,
    Name,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HandshakeStage::Direction => "direction",
            HandshakeStage::DataType => "data type",
            HandshakeStage::DataSize => "data size",
            HandshakeStage::Name => "name",
        };
        f.write_str(label)
    }
}

/// Reasons a handshake fails. Every variant is terminal for the connection.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The client stayed silent for `stalls` consecutive attempts.
    #[error("no data from client during {stage} stage after {stalls} attempts")]
    Stalled { stage: HandshakeStage, stalls: u32 },

    /// First byte was not a direction sentinel.
    #[error("unexpected direction byte {0}")]
    UnexpectedDirection(u8),

    /// Recognised data type that this server does not implement.
    #[error("{0} streams are not implemented")]
    UnsupportedDataType(DataType),

    /// Data type byte matched no known sentinel.
    #[error("unexpected data type byte {0}")]
    UnexpectedDataType(u8),

    /// A non-zero read returned fewer bytes than the stage requires.
    #[error("read {got} bytes during {stage} stage, expected {expected}")]
    ShortRead {
        stage: HandshakeStage,
        expected: usize,
        got: usize,
    },

    /// Negotiated values per cycle outside `1..=max`.
    #[error("data size {size} outside 1..={max}")]
    InvalidDataSize { size: u32, max: u32 },

    /// Declared name length above the sanity limit.
    #[error("stream name of {len} bytes exceeds limit of {max}")]
    NameTooLong { len: u32, max: u32 },

    /// Another live connection already negotiated this name.
    #[error("stream name {0:?} is already held by a live connection")]
    NameInUse(String),

    /// The peer went away mid-negotiation.
    #[error("client disconnected during {stage} stage")]
    Disconnected { stage: HandshakeStage },

    /// Transport failure.
    #[error("I/O error during {stage} stage: {source}")]
    Io {
        stage: HandshakeStage,
        #[source]
        source: io::Error,
    },

    /// Handshake attempted on a connection that cannot negotiate.
    #[error("connection is {0}")]
    InvalidState(&'static str),
}

/// Reasons a steady-state cycle fails.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("expected acknowledgement byte {expected}, got {got}")]
    UnexpectedAck { expected: u8, got: u8 },

    #[error("wrote {written} of {expected} bytes")]
    ShortWrite { expected: usize, written: usize },

    /// Partial blocks are never committed to the buffer.
    #[error("read {got} of {expected} bytes")]
    ShortRead { expected: usize, got: usize },

    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised to the computation side by explicit buffer access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Pop from an empty buffer.
    #[error("stream buffer is empty")]
    Empty,
    /// No buffer exists until the stream name has been negotiated.
    #[error("stream buffer is not attached yet")]
    Detached,
}
