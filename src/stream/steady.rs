//! Post-handshake data pump.
//!
//! # Responsibilities
//! - TARGET: drain one cycle from the FIFO, write it, wait for the ack
//! - SOURCE: read one cycle, append it to the FIFO, write the ack
//! - Count zero-byte ticks; the ceiling ends the session gracefully
//!
//! # Invariants
//! - At most one written block is unacknowledged at a time
//! - A block is either committed to the FIFO whole or not at all
//! - The FIFO lock covers only the copy into or out of scratch memory

use super::buffer::FifoBuffer;
use super::error::SessionError;
use super::stall::StallCounter;
use super::transport::{classify, is_disconnect, Transfer, Transport};
use crate::observability::metrics;
use crate::protocol::codec::{block_len, decode_values, encode_values};
use crate::protocol::{Direction, RESP_RECVD};

/// Non-error result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Continue,
    /// The remote went quiet, ran dry or disconnected.
    Finished,
}

/// Scratch memory and flow-control state, sized once per connection.
#[derive(Debug)]
pub struct SteadyState {
    scratch: Vec<f64>,
    wire: Vec<u8>,
    unacknowledged: bool,
}

impl SteadyState {
    pub fn new(data_size: usize) -> Self {
        Self {
            scratch: vec![0.0; data_size],
            wire: vec![0u8; block_len(data_size)],
            unacknowledged: false,
        }
    }

    /// Values moved per cycle.
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// True between a completed write and the ack that answers it.
    pub fn unacknowledged(&self) -> bool {
        self.unacknowledged
    }

    /// Server is the producer: ack-gated write of one block.
    pub fn write_cycle<T: Transport>(
        &mut self,
        transport: &mut T,
        buffer: &FifoBuffer,
        stalls: &mut StallCounter,
    ) -> Result<Cycle, SessionError> {
        if self.unacknowledged {
            let mut ack = [0u8; 1];
            match classify(transport.recv(&mut ack), ack.len()) {
                Transfer::Complete => {
                    if ack[0] != RESP_RECVD {
                        return Err(SessionError::UnexpectedAck {
                            expected: RESP_RECVD,
                            got: ack[0],
                        });
                    }
                    self.unacknowledged = false;
                    stalls.reset();
                }
                Transfer::Empty | Transfer::Short(_) => {
                    if stalls.record() {
                        tracing::info!(stalls = stalls.count(), "No acknowledgement from client, assume finished");
                        return Ok(Cycle::Finished);
                    }
                    return Ok(Cycle::Continue);
                }
                Transfer::Disconnected(err) => {
                    tracing::info!(error = %err, "Client disconnected while acknowledging");
                    return Ok(Cycle::Finished);
                }
                Transfer::Failed(err) => return Err(SessionError::Io(err)),
            }
        }

        if !buffer.drain_front_into(&mut self.scratch) {
            if stalls.record() {
                tracing::info!(stalls = stalls.count(), "No data left to write, assume finished");
                return Ok(Cycle::Finished);
            }
            return Ok(Cycle::Continue);
        }

        encode_values(&self.scratch, &mut self.wire);
        match transport.send(&self.wire) {
            Ok(n) if n == self.wire.len() => {}
            Ok(written) => {
                return Err(SessionError::ShortWrite {
                    expected: self.wire.len(),
                    written,
                })
            }
            Err(err) => return Err(SessionError::Io(err)),
        }
        tracing::trace!(bytes = self.wire.len(), "Wrote block to client");

        self.unacknowledged = true;
        stalls.reset();
        metrics::record_batch(Direction::Target, self.scratch.len());
        Ok(Cycle::Continue)
    }

    /// Server is the consumer: read one block, commit it, acknowledge.
    pub fn read_cycle<T: Transport>(
        &mut self,
        transport: &mut T,
        buffer: &FifoBuffer,
        stalls: &mut StallCounter,
    ) -> Result<Cycle, SessionError> {
        match classify(transport.recv(&mut self.wire), self.wire.len()) {
            Transfer::Complete => {
                decode_values(&self.wire, &mut self.scratch);
                buffer.extend_from_slice(&self.scratch);
                stalls.reset();
                metrics::record_batch(Direction::Source, self.scratch.len());
                tracing::trace!(bytes = self.wire.len(), "Read block from client");
            }
            Transfer::Empty => {
                if stalls.record() {
                    tracing::info!(stalls = stalls.count(), "No data available, assume finished");
                    return Ok(Cycle::Finished);
                }
                return Ok(Cycle::Continue);
            }
            Transfer::Short(got) => {
                return Err(SessionError::ShortRead {
                    expected: self.wire.len(),
                    got,
                })
            }
            Transfer::Disconnected(err) => {
                tracing::info!(error = %err, "Client disconnected");
                return Ok(Cycle::Finished);
            }
            Transfer::Failed(err) => return Err(SessionError::Io(err)),
        }

        match transport.send(&[RESP_RECVD]) {
            Ok(1) => Ok(Cycle::Continue),
            Ok(written) => Err(SessionError::ShortWrite {
                expected: 1,
                written,
            }),
            Err(err) if is_disconnect(&err) => {
                tracing::info!(error = %err, "Client disconnected before acknowledgement");
                Ok(Cycle::Finished)
            }
            Err(err) => Err(SessionError::Io(err)),
        }
    }
}
