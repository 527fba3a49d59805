//! Little-endian encoding of length prefixes and value blocks.

use super::VALUE_WIDTH;

/// Decode a 4-byte little-endian unsigned integer.
pub fn read_u32_le(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Encode `values` into `out`, which must be exactly `values.len() * 8` bytes.
pub fn encode_values(values: &[f64], out: &mut [u8]) {
    debug_assert_eq!(out.len(), values.len() * VALUE_WIDTH);
    for (chunk, value) in out.chunks_exact_mut(VALUE_WIDTH).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
}

/// Decode a block of little-endian doubles from `bytes` into `out`.
pub fn decode_values(bytes: &[u8], out: &mut [f64]) {
    debug_assert_eq!(bytes.len(), out.len() * VALUE_WIDTH);
    for (chunk, slot) in bytes.chunks_exact(VALUE_WIDTH).zip(out.iter_mut()) {
        let mut raw = [0u8; VALUE_WIDTH];
        raw.copy_from_slice(chunk);
        *slot = f64::from_le_bytes(raw);
    }
}

/// Number of bytes in one cycle of `data_size` values.
pub fn block_len(data_size: usize) -> usize {
    data_size * VALUE_WIDTH
}
