//! Wire protocol vocabulary.
//!
//! # Wire Format
//! ```text
//! client → server   1 byte   direction   (AM_SOURCE | AM_TARGET)
//! server → client   1 byte   RESP_HELLO
//! client → server   1 byte   data type   (RESP_DATA_NUMS; spikes/impulses rejected)
//! server → client   1 byte   RESP_RECVD
//! client → server   4 bytes  data size   (u32 LE, values per cycle)
//! server → client   1 byte   RESP_RECVD
//! client → server   4 bytes  name length (u32 LE), then the name bytes
//! server → client   1 byte   RESP_RECVD
//!
//! steady state, repeating:
//!   TARGET: server → client  data_size × f64 LE;  client → server RESP_RECVD
//!   SOURCE: client → server  data_size × f64 LE;  server → client RESP_RECVD
//! ```
//!
//! # Design Decisions
//! - Sentinels are single non-alphanumeric bytes, so they never collide with name payloads
//! - Direction and data type are closed enums; unknown bytes never get past `from_byte`

pub mod codec;

use std::fmt;

/// Analog ("nums") data type flag.
pub const RESP_DATA_NUMS: u8 = 31;
/// Event (spike) data type flag. Recognised, not supported.
pub const RESP_DATA_SPIKES: u8 = 32;
/// Impulse data type flag. Recognised, not supported.
pub const RESP_DATA_IMPULSES: u8 = 33;
/// Reply to a valid direction byte.
pub const RESP_HELLO: u8 = 41;
/// Generic acknowledgement.
pub const RESP_RECVD: u8 = 42;
/// Client declares itself a data source.
pub const AM_SOURCE: u8 = 45;
/// Client declares itself a data target.
pub const AM_TARGET: u8 = 46;

/// Consecutive zero-byte reads tolerated before a stage gives up.
pub const NO_DATA_MAX_COUNT: u32 = 100;
/// Longest stream name accepted during the handshake.
pub const MAX_NAME_LEN: u32 = 1024;
/// Size of one value on the wire.
pub const VALUE_WIDTH: usize = std::mem::size_of::<f64>();

/// Which way data flows, as declared by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The client produces values; the server reads them.
    Source,
    /// The client consumes values; the server writes them.
    Target,
}

impl Direction {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            AM_SOURCE => Some(Direction::Source),
            AM_TARGET => Some(Direction::Target),
            _ => None,
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Source => "source",
            Direction::Target => "target",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of payload carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Double precision numbers. The only implemented type.
    Analog,
    /// Spike events.
    Event,
    /// Impulses.
    Impulse,
}

impl DataType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            RESP_DATA_NUMS => Some(DataType::Analog),
            RESP_DATA_SPIKES => Some(DataType::Event),
            RESP_DATA_IMPULSES => Some(DataType::Impulse),
            _ => None,
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, DataType::Analog)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Analog => f.write_str("analog"),
            DataType::Event => f.write_str("event"),
            DataType::Impulse => f.write_str("impulse"),
        }
    }
}
