//! Four-stage connection negotiation.
//!
//! # Stages
//! ```text
//! Direction → DataType → DataSize → Name → done
//! ```
//! Each stage blocks on its own bytes. A zero-byte read is a stall and leaves
//! the stage in place; the `stall_limit`-th consecutive stall fails the whole
//! handshake. Any stage that makes progress resets the counter. Non-zero
//! reads of the wrong length are fatal and never retried.

use std::io;

use super::buffer::FifoBuffer;
use super::error::{HandshakeError, HandshakeStage};
use super::handle::StreamParams;
use super::registry::StreamRegistry;
use super::stall::StallCounter;
use super::steady::SteadyState;
use super::transport::{classify, is_disconnect, Transfer, Transport};
use super::ProtocolLimits;
use crate::protocol::codec::read_u32_le;
use crate::protocol::{DataType, Direction, RESP_HELLO, RESP_RECVD};

/// Everything a successful handshake produces.
#[derive(Debug)]
pub struct Negotiated {
    pub params: StreamParams,
    /// Scratch memory sized for one cycle.
    pub session: SteadyState,
    pub buffer: FifoBuffer,
    /// Whether `buffer` came from the registry.
    pub adopted: bool,
}

/// Drives the negotiation over a borrowed transport.
pub struct HandshakeEngine<'a, T: Transport> {
    transport: &'a mut T,
    stalls: &'a mut StallCounter,
    registry: &'a dyn StreamRegistry,
    limits: ProtocolLimits,
}

impl<'a, T: Transport> HandshakeEngine<'a, T> {
    pub fn new(
        transport: &'a mut T,
        stalls: &'a mut StallCounter,
        registry: &'a dyn StreamRegistry,
        limits: ProtocolLimits,
    ) -> Self {
        Self {
            transport,
            stalls,
            registry,
            limits,
        }
    }

    /// Run all four stages. Nothing is published unless every stage succeeds.
    pub fn run(mut self) -> Result<Negotiated, HandshakeError> {
        self.stalls.reset();

        let direction = self.await_stage(HandshakeStage::Direction, Self::read_direction)?;
        let data_type = self.await_stage(HandshakeStage::DataType, Self::read_data_type)?;
        let data_size = self.await_stage(HandshakeStage::DataSize, Self::read_data_size)?;
        let session = SteadyState::new(data_size);
        let name = self.await_stage(HandshakeStage::Name, Self::read_name)?;

        let (buffer, adopted) = match self.registry.take(&name) {
            Some(buffer) => {
                tracing::info!(stream = %name, values = buffer.len(), "Using pre-supplied data");
                (buffer, true)
            }
            None => {
                tracing::debug!(stream = %name, "No pre-supplied data, allocating new store");
                (FifoBuffer::new(), false)
            }
        };

        Ok(Negotiated {
            params: StreamParams {
                name,
                direction,
                data_type,
                data_size,
            },
            session,
            buffer,
            adopted,
        })
    }

    /// Repeat `step` until it yields a value, counting stalls in between.
    fn await_stage<X>(
        &mut self,
        stage: HandshakeStage,
        mut step: impl FnMut(&mut Self) -> Result<Option<X>, HandshakeError>,
    ) -> Result<X, HandshakeError> {
        loop {
            if let Some(value) = step(self)? {
                self.stalls.reset();
                tracing::debug!(%stage, "Handshake stage complete");
                return Ok(value);
            }
            if self.stalls.record() {
                return Err(HandshakeError::Stalled {
                    stage,
                    stalls: self.stalls.count(),
                });
            }
        }
    }

    fn read_direction(&mut self) -> Result<Option<Direction>, HandshakeError> {
        let stage = HandshakeStage::Direction;
        let mut byte = [0u8; 1];
        if !self.recv_exact(stage, &mut byte)? {
            return Ok(None);
        }
        let direction =
            Direction::from_byte(byte[0]).ok_or(HandshakeError::UnexpectedDirection(byte[0]))?;
        self.reply(stage, RESP_HELLO)?;
        Ok(Some(direction))
    }

    fn read_data_type(&mut self) -> Result<Option<DataType>, HandshakeError> {
        let stage = HandshakeStage::DataType;
        let mut byte = [0u8; 1];
        if !self.recv_exact(stage, &mut byte)? {
            return Ok(None);
        }
        let data_type =
            DataType::from_byte(byte[0]).ok_or(HandshakeError::UnexpectedDataType(byte[0]))?;
        if !data_type.is_supported() {
            tracing::info!(%data_type, "Data type recognised but not implemented");
            return Err(HandshakeError::UnsupportedDataType(data_type));
        }
        self.reply(stage, RESP_RECVD)?;
        Ok(Some(data_type))
    }

    fn read_data_size(&mut self) -> Result<Option<usize>, HandshakeError> {
        let stage = HandshakeStage::DataSize;
        let mut raw = [0u8; 4];
        if !self.recv_exact(stage, &mut raw)? {
            return Ok(None);
        }
        let size = read_u32_le(raw);
        if size == 0 || size > self.limits.max_data_size {
            return Err(HandshakeError::InvalidDataSize {
                size,
                max: self.limits.max_data_size,
            });
        }
        tracing::debug!(data_size = size, "Client data size (values per cycle)");
        self.reply(stage, RESP_RECVD)?;
        Ok(Some(size as usize))
    }

    fn read_name(&mut self) -> Result<Option<String>, HandshakeError> {
        let stage = HandshakeStage::Name;
        let mut raw = [0u8; 4];
        if !self.recv_exact(stage, &mut raw)? {
            return Ok(None);
        }
        let len = read_u32_le(raw);
        if len > self.limits.max_name_len {
            return Err(HandshakeError::NameTooLong {
                len,
                max: self.limits.max_name_len,
            });
        }

        // The payload is read once; anything other than the full name is fatal.
        let mut payload = vec![0u8; len as usize];
        let received = if payload.is_empty() {
            Ok(0)
        } else {
            self.transport.recv(&mut payload)
        };
        match classify(received, payload.len()) {
            Transfer::Complete => {}
            Transfer::Empty => {
                return Err(HandshakeError::ShortRead {
                    stage,
                    expected: payload.len(),
                    got: 0,
                })
            }
            Transfer::Short(got) => {
                return Err(HandshakeError::ShortRead {
                    stage,
                    expected: payload.len(),
                    got,
                })
            }
            Transfer::Disconnected(_) => return Err(HandshakeError::Disconnected { stage }),
            Transfer::Failed(source) => return Err(HandshakeError::Io { stage, source }),
        }

        let name = String::from_utf8_lossy(&payload).into_owned();
        tracing::debug!(stream = %name, "Connection name received");
        if !self.registry.claim(&name) {
            return Err(HandshakeError::NameInUse(name));
        }
        if let Err(err) = self.reply(stage, RESP_RECVD) {
            self.registry.release(&name);
            return Err(err);
        }
        Ok(Some(name))
    }

    /// `Ok(true)` when `buf` was filled, `Ok(false)` on a zero-byte read.
    fn recv_exact(&mut self, stage: HandshakeStage, buf: &mut [u8]) -> Result<bool, HandshakeError> {
        match classify(self.transport.recv(buf), buf.len()) {
            Transfer::Complete => Ok(true),
            Transfer::Empty => Ok(false),
            Transfer::Short(got) => Err(HandshakeError::ShortRead {
                stage,
                expected: buf.len(),
                got,
            }),
            Transfer::Disconnected(_) => Err(HandshakeError::Disconnected { stage }),
            Transfer::Failed(source) => Err(HandshakeError::Io { stage, source }),
        }
    }

    fn reply(&mut self, stage: HandshakeStage, byte: u8) -> Result<(), HandshakeError> {
        match self.transport.send(&[byte]) {
            Ok(1) => Ok(()),
            Ok(_) => Err(HandshakeError::Io {
                stage,
                source: io::Error::from(io::ErrorKind::WriteZero),
            }),
            Err(err) if is_disconnect(&err) => Err(HandshakeError::Disconnected { stage }),
            Err(source) => Err(HandshakeError::Io { stage, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        AM_SOURCE, AM_TARGET, NO_DATA_MAX_COUNT, RESP_DATA_IMPULSES, RESP_DATA_NUMS,
        RESP_DATA_SPIKES,
    };
    use crate::stream::registry::DataCache;
    use crate::stream::transport::mock::{MockTransport, Read};
    use proptest::prelude::*;

    fn script(direction: u8, size: u32, name: &str) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[direction])
            .push_bytes(&[RESP_DATA_NUMS])
            .push_bytes(&size.to_le_bytes())
            .push_bytes(&(name.len() as u32).to_le_bytes())
            .push_bytes(name.as_bytes());
        transport
    }

    fn negotiate(
        transport: &mut MockTransport,
        registry: &DataCache,
    ) -> Result<Negotiated, HandshakeError> {
        let mut stalls = StallCounter::new(NO_DATA_MAX_COUNT);
        HandshakeEngine::new(transport, &mut stalls, registry, ProtocolLimits::default()).run()
    }

    #[test]
    fn target_handshake_replies_in_order() {
        let registry = DataCache::new();
        let mut transport = script(AM_TARGET, 3, "test");
        let negotiated = negotiate(&mut transport, &registry).unwrap();

        assert_eq!(
            transport.written,
            vec![RESP_HELLO, RESP_RECVD, RESP_RECVD, RESP_RECVD]
        );
        assert_eq!(negotiated.params.direction, Direction::Target);
        assert_eq!(negotiated.params.data_type, DataType::Analog);
        assert_eq!(negotiated.params.data_size, 3);
        assert_eq!(negotiated.params.name, "test");
        assert_eq!(negotiated.session.scratch_len(), 3);
        assert!(!negotiated.adopted);
        assert!(negotiated.buffer.is_empty());
    }

    #[test]
    fn adopts_pre_supplied_buffer() {
        let registry = DataCache::new();
        registry.insert("pop1", FifoBuffer::from_values([9.9]));
        let mut transport = script(AM_SOURCE, 1, "pop1");

        let negotiated = negotiate(&mut transport, &registry).unwrap();
        assert!(negotiated.adopted);
        assert_eq!(negotiated.buffer.snapshot(), vec![9.9]);
        assert!(!registry.contains("pop1"));
    }

    #[test]
    fn rejects_unknown_direction() {
        let registry = DataCache::new();
        let mut transport = script(b'x', 1, "a");
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(err, HandshakeError::UnexpectedDirection(b'x')));
        assert!(transport.written.is_empty());
    }

    #[test]
    fn rejects_spikes_and_impulses() {
        for flag in [RESP_DATA_SPIKES, RESP_DATA_IMPULSES] {
            let registry = DataCache::new();
            let mut transport = MockTransport::new();
            transport.push_bytes(&[AM_SOURCE]).push_bytes(&[flag]);
            let err = negotiate(&mut transport, &registry).unwrap_err();
            assert!(matches!(err, HandshakeError::UnsupportedDataType(_)));
            assert_eq!(transport.written, vec![RESP_HELLO]);
        }
    }

    #[test]
    fn rejects_unknown_data_type() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport.push_bytes(&[AM_TARGET]).push_bytes(&[RESP_HELLO]);
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(err, HandshakeError::UnexpectedDataType(RESP_HELLO)));
    }

    #[test]
    fn partial_size_read_is_fatal() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_TARGET])
            .push_bytes(&[RESP_DATA_NUMS])
            .push(Read::Partial(vec![3, 0, 0, 0], 2));
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::ShortRead {
                stage: HandshakeStage::DataSize,
                expected: 4,
                got: 2
            }
        ));
    }

    #[test]
    fn zero_data_size_is_rejected() {
        let registry = DataCache::new();
        let mut transport = script(AM_TARGET, 0, "z");
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(err, HandshakeError::InvalidDataSize { size: 0, .. }));
    }

    #[test]
    fn insanely_long_name_is_rejected() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_SOURCE])
            .push_bytes(&[RESP_DATA_NUMS])
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(&1025u32.to_le_bytes());
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(err, HandshakeError::NameTooLong { len: 1025, .. }));
    }

    #[test]
    fn truncated_name_is_fatal_not_retried() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_SOURCE])
            .push_bytes(&[RESP_DATA_NUMS])
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(&8u32.to_le_bytes())
            .push(Read::Partial(b"popul".to_vec(), 5));
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::ShortRead {
                stage: HandshakeStage::Name,
                expected: 8,
                got: 5
            }
        ));
    }

    #[test]
    fn stalls_below_the_ceiling_are_tolerated() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport
            .push_nothing(NO_DATA_MAX_COUNT as usize - 1)
            .push_bytes(&[AM_TARGET])
            .push_nothing(NO_DATA_MAX_COUNT as usize - 1)
            .push_bytes(&[RESP_DATA_NUMS])
            .push_bytes(&2u32.to_le_bytes())
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(b"n");
        assert!(negotiate(&mut transport, &registry).is_ok());
    }

    #[test]
    fn stall_ceiling_fails_the_handshake() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_TARGET])
            .push_nothing(NO_DATA_MAX_COUNT as usize)
            .push_bytes(&[RESP_DATA_NUMS]);
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::Stalled {
                stage: HandshakeStage::DataType,
                stalls: NO_DATA_MAX_COUNT
            }
        ));
        // the data type byte was never consumed
        assert_eq!(transport.pending_reads(), 1);
    }

    #[test]
    fn reset_during_negotiation_is_reported() {
        let registry = DataCache::new();
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_TARGET])
            .push(Read::Fail(io::ErrorKind::ConnectionReset));
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(
            err,
            HandshakeError::Disconnected {
                stage: HandshakeStage::DataType
            }
        ));
    }

    #[test]
    fn empty_name_is_accepted() {
        let registry = DataCache::new();
        let mut transport = script(AM_SOURCE, 1, "");
        let negotiated = negotiate(&mut transport, &registry).unwrap();
        assert_eq!(negotiated.params.name, "");
    }

    #[test]
    fn name_held_by_live_stream_is_refused() {
        let registry = DataCache::new();
        let mut first = script(AM_TARGET, 1, "dup");
        negotiate(&mut first, &registry).unwrap();

        let mut second = script(AM_TARGET, 1, "dup");
        let err = negotiate(&mut second, &registry).unwrap_err();
        assert!(matches!(err, HandshakeError::NameInUse(ref name) if name == "dup"));
        // no ack for the refused name
        assert_eq!(second.written, vec![RESP_HELLO, RESP_RECVD, RESP_RECVD]);

        registry.release("dup");
        let mut third = script(AM_SOURCE, 1, "dup");
        assert!(negotiate(&mut third, &registry).is_ok());
    }

    #[test]
    fn name_is_released_when_final_ack_fails() {
        let registry = DataCache::new();
        let mut transport = script(AM_TARGET, 1, "gone");
        transport.fail_writes_after(3, io::ErrorKind::BrokenPipe);
        let err = negotiate(&mut transport, &registry).unwrap_err();
        assert!(matches!(err, HandshakeError::Disconnected { stage: HandshakeStage::Name }));
        assert!(registry.claim("gone"));
    }

    proptest! {
        #[test]
        fn any_valid_sequence_negotiates(
            target in any::<bool>(),
            size in 1u32..100_000,
            name in "[a-zA-Z0-9_]{0,64}",
        ) {
            let registry = DataCache::new();
            let direction = if target { AM_TARGET } else { AM_SOURCE };
            let mut transport = script(direction, size, &name);
            let negotiated = negotiate(&mut transport, &registry).unwrap();
            prop_assert_eq!(negotiated.params.data_size, size as usize);
            prop_assert_eq!(negotiated.session.scratch_len(), size as usize);
            prop_assert_eq!(negotiated.params.name, name);
        }
    }
}
