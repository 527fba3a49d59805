//! One negotiated stream, driven tick by tick from its worker thread.
//!
//! # Lifecycle
//! ```text
//! new(transport) ─ handshake() ─▶ established ─ tick()* ─▶ finished | failed
//!                                                        └─ close() releases the socket
//! ```
//!
//! The owning worker calls `handshake` once and then `tick` until the
//! outcome is terminal. Every call is safe to abandon between ticks.

use std::sync::Arc;

use super::error::HandshakeError;
use super::handle::{StreamHandle, StreamShared};
use super::handshake::HandshakeEngine;
use super::registry::StreamRegistry;
use super::stall::StallCounter;
use super::steady::{Cycle, SteadyState};
use super::transport::Transport;
use super::{ProtocolLimits, TickOutcome};
use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::protocol::Direction;

/// Worker-side state of a single stream connection.
pub struct StreamConnection<T: Transport> {
    shared: Arc<StreamShared>,
    transport: Option<T>,
    registry: Arc<dyn StreamRegistry>,
    limits: ProtocolLimits,
    stalls: StallCounter,
    session: Option<SteadyState>,
}

impl<T: Transport> StreamConnection<T> {
    pub fn new(
        id: ConnectionId,
        transport: T,
        registry: Arc<dyn StreamRegistry>,
        limits: ProtocolLimits,
    ) -> Self {
        Self {
            shared: Arc::new(StreamShared::new(id)),
            transport: Some(transport),
            registry,
            limits,
            stalls: StallCounter::new(limits.stall_limit),
            session: None,
        }
    }

    /// Handle for the computation side.
    pub fn handle(&self) -> StreamHandle {
        StreamHandle::new(Arc::clone(&self.shared))
    }

    pub fn id(&self) -> ConnectionId {
        self.shared.id()
    }

    /// Negotiate direction, type, size and name.
    ///
    /// On failure the connection is marked failed before the error returns.
    pub fn handshake(&mut self) -> Result<(), HandshakeError> {
        if self.shared.is_established() {
            return Ok(());
        }
        if self.shared.is_failed() {
            return Err(HandshakeError::InvalidState("failed"));
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(HandshakeError::InvalidState("closed"));
        };

        let result = HandshakeEngine::new(
            transport,
            &mut self.stalls,
            self.registry.as_ref(),
            self.limits,
        )
        .run();

        match result {
            Ok(negotiated) => {
                tracing::info!(
                    connection_id = %self.shared.id(),
                    stream = %negotiated.params.name,
                    direction = %negotiated.params.direction,
                    data_size = negotiated.params.data_size,
                    adopted = negotiated.adopted,
                    "Connection established"
                );
                self.session = Some(negotiated.session);
                self.shared.establish(negotiated.params, negotiated.buffer);
                metrics::record_handshake("established");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(connection_id = %self.shared.id(), error = %err, "Handshake failed");
                self.shared.mark_failed();
                metrics::record_handshake("failed");
                Err(err)
            }
        }
    }

    /// Perform one tick of input/output in the negotiated direction.
    pub fn tick(&mut self) -> TickOutcome {
        if self.shared.is_failed() {
            return TickOutcome::Failed;
        }
        if self.shared.is_finished() {
            return TickOutcome::Finished;
        }
        if !self.shared.is_established() {
            tracing::trace!(connection_id = %self.shared.id(), "Connection not established");
            return TickOutcome::Continue;
        }

        let (Some(transport), Some(session), Some(buffer), Some(params)) = (
            self.transport.as_mut(),
            self.session.as_mut(),
            self.shared.buffer(),
            self.shared.params(),
        ) else {
            tracing::error!(
                connection_id = %self.shared.id(),
                "Established connection has no direction or buffer"
            );
            return TickOutcome::Continue;
        };

        let result = match params.direction {
            Direction::Target => session.write_cycle(transport, buffer, &mut self.stalls),
            Direction::Source => session.read_cycle(transport, buffer, &mut self.stalls),
        };

        match result {
            Ok(Cycle::Continue) => TickOutcome::Continue,
            Ok(Cycle::Finished) => {
                tracing::info!(
                    connection_id = %self.shared.id(),
                    stream = %params.name,
                    "Session finished"
                );
                self.shared.mark_finished();
                metrics::record_session_end("finished");
                TickOutcome::Finished
            }
            Err(err) => {
                tracing::error!(
                    connection_id = %self.shared.id(),
                    stream = %params.name,
                    direction = %params.direction,
                    error = %err,
                    "Session failed"
                );
                self.shared.mark_failed();
                self.shared.mark_finished();
                metrics::record_session_end("failed");
                TickOutcome::Failed
            }
        }
    }

    /// Close the socket and give the stream name back to the registry.
    /// The connection is no longer established afterwards.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close() {
                tracing::warn!(connection_id = %self.shared.id(), error = %err, "Error closing socket");
            }
            if let Some(params) = self.shared.params() {
                self.registry.release(&params.name);
            }
        }
        self.shared.mark_closed();
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

    /// Values per cycle, once negotiated.
    pub fn data_size(&self) -> Option<usize> {
        self.shared.params().map(|p| p.data_size)
    }

    pub fn name(&self) -> Option<&str> {
        self.shared.params().map(|p| p.name.as_str())
    }

    pub fn direction(&self) -> Option<Direction> {
        self.shared.params().map(|p| p.direction)
    }

    /// A written block is waiting for its acknowledgement.
    pub fn unacknowledged_data_sent(&self) -> bool {
        self.session.as_ref().is_some_and(SteadyState::unacknowledged)
    }

    /// Scratch capacity in values; zero before the data size is known.
    pub fn scratch_len(&self) -> usize {
        self.session.as_ref().map(SteadyState::scratch_len).unwrap_or(0)
    }

    /// Consecutive ticks that moved nothing.
    pub fn stall_count(&self) -> u32 {
        self.stalls.count()
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }
}

impl<T: Transport> Drop for StreamConnection<T> {
    fn drop(&mut self) {
        self.close();
    }
}
