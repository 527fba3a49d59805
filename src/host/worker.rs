//! Per-connection worker loop. Runs on a dedicated blocking thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::stream::{StreamConnection, TickOutcome, Transport};

/// Why a worker returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The handshake did not complete.
    HandshakeFailed,
    /// The session reached a terminal tick outcome.
    Session(TickOutcome),
    /// The host asked every worker to stop.
    Stopped,
}

/// Handshake, then tick until terminal or `stop` is raised, then close.
///
/// Sleeps `idle` after any tick that left the stall counter non-zero.
pub fn drive<T: Transport>(
    mut conn: StreamConnection<T>,
    stop: &AtomicBool,
    idle: Duration,
) -> WorkerExit {
    if conn.handshake().is_err() {
        conn.close();
        return WorkerExit::HandshakeFailed;
    }

    let exit = loop {
        if stop.load(Ordering::Acquire) {
            tracing::debug!(connection_id = %conn.id(), "Stop requested");
            break WorkerExit::Stopped;
        }
        match conn.tick() {
            TickOutcome::Continue => {
                if conn.stall_count() > 0 && !idle.is_zero() {
                    thread::sleep(idle);
                }
            }
            outcome => break WorkerExit::Session(outcome),
        }
    };

    conn.close();
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::ConnectionId;
    use crate::protocol::{AM_SOURCE, RESP_DATA_NUMS, RESP_DATA_SPIKES};
    use crate::stream::transport::mock::MockTransport;
    use crate::stream::{DataCache, ProtocolLimits};
    use std::sync::Arc;

    fn connection(transport: MockTransport, stall_limit: u32) -> StreamConnection<MockTransport> {
        StreamConnection::new(
            ConnectionId::new(),
            transport,
            Arc::new(DataCache::new()),
            ProtocolLimits {
                stall_limit,
                ..ProtocolLimits::default()
            },
        )
    }

    #[test]
    fn failed_handshake_closes() {
        let mut transport = MockTransport::new();
        transport.push_bytes(&[AM_SOURCE]).push_bytes(&[RESP_DATA_SPIKES]);
        let conn = connection(transport, 5);
        let handle = conn.handle();

        let stop = AtomicBool::new(false);
        assert_eq!(drive(conn, &stop, Duration::ZERO), WorkerExit::HandshakeFailed);
        assert!(handle.is_failed());
    }

    #[test]
    fn runs_until_session_finishes() {
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_SOURCE])
            .push_bytes(&[RESP_DATA_NUMS])
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(b"s")
            .push_bytes(&4.5f64.to_le_bytes());
        let conn = connection(transport, 5);
        let handle = conn.handle();

        let stop = AtomicBool::new(false);
        assert_eq!(
            drive(conn, &stop, Duration::ZERO),
            WorkerExit::Session(TickOutcome::Finished)
        );
        assert_eq!(handle.take_all(), vec![4.5]);
        assert!(!handle.is_established());
    }

    #[test]
    fn stop_flag_ends_the_loop() {
        let mut transport = MockTransport::new();
        transport
            .push_bytes(&[AM_SOURCE])
            .push_bytes(&[RESP_DATA_NUMS])
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(&1u32.to_le_bytes())
            .push_bytes(b"s");
        let conn = connection(transport, u32::MAX);

        let stop = AtomicBool::new(true);
        assert_eq!(drive(conn, &stop, Duration::ZERO), WorkerExit::Stopped);
    }
}
