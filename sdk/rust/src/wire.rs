//! Protocol bytes, as seen from the client.

pub const RESP_DATA_NUMS: u8 = 31;
pub const RESP_DATA_SPIKES: u8 = 32;
pub const RESP_DATA_IMPULSES: u8 = 33;
pub const RESP_HELLO: u8 = 41;
pub const RESP_RECVD: u8 = 42;
pub const AM_SOURCE: u8 = 45;
pub const AM_TARGET: u8 = 46;

/// Bytes per value on the wire (little-endian f64).
pub const VALUE_WIDTH: usize = 8;
