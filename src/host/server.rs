//! Accept loop for stream clients.
//!
//! # Responsibilities
//! - Accept sockets under the listener's connection limit
//! - Hand each socket to a blocking worker with its own `StreamConnection`
//! - Publish every connection's handle in the table
//! - Stop accepting when shutdown is signalled

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;

use super::table::{ConnectionTable, HostHandle};
use super::worker::{self, WorkerExit};
use crate::config::ProtocolConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::net::tcp::TcpTransport;
use crate::observability::metrics;
use crate::stream::{DataCache, ProtocolLimits, StreamConnection, StreamRegistry};

/// TCP front end of the stream engine.
pub struct StreamServer {
    limits: ProtocolLimits,
    read_timeout: Duration,
    idle_tick: Duration,
    table: ConnectionTable,
    cache: DataCache,
    tracker: ConnectionTracker,
    stop: Arc<AtomicBool>,
}

impl StreamServer {
    pub fn new(protocol: &ProtocolConfig, cache: DataCache, shutdown: &Shutdown) -> Self {
        Self {
            limits: protocol.limits(),
            read_timeout: protocol.read_timeout(),
            idle_tick: protocol.idle_tick(),
            table: ConnectionTable::new(),
            cache,
            tracker: ConnectionTracker::new(),
            stop: shutdown.stop_flag(),
        }
    }

    /// Computation-side view of the server's connections and registry.
    pub fn host(&self) -> HostHandle {
        HostHandle::new(self.table.clone(), self.cache.clone())
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept until `shutdown_rx` fires or the listener closes.
    pub async fn run(self, listener: Listener, mut shutdown_rx: broadcast::Receiver<()>) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Stream server starting");
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.spawn_worker(stream, peer, permit),
                    Err(ListenerError::Closed) => break,
                    Err(e) => tracing::warn!(error = %e, "Accept failed"),
                },
                _ = shutdown_rx.recv() => {
                    tracing::info!("Stream server no longer accepting");
                    break;
                }
            }
        }
    }

    fn spawn_worker(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let transport = match stream
            .into_std()
            .and_then(|stream| TcpTransport::new(stream, self.read_timeout))
        {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!(peer_addr = %peer, error = %e, "Failed to prepare socket");
                return;
            }
        };

        let guard = self.tracker.track();
        let id = guard.id();
        let registry: Arc<dyn StreamRegistry> = Arc::new(self.cache.clone());
        let conn = StreamConnection::new(id, transport, registry, self.limits);
        self.table.insert(conn.handle());
        metrics::set_active_connections(self.tracker.active_count());

        tracing::debug!(connection_id = %id, peer_addr = %peer, "Worker starting");

        let table = self.table.clone();
        let tracker = self.tracker.clone();
        let stop = Arc::clone(&self.stop);
        let idle = self.idle_tick;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let exit = worker::drive(conn, &stop, idle);
            table.retire(id);
            drop(guard);
            metrics::set_active_connections(tracker.active_count());

            match exit {
                WorkerExit::HandshakeFailed => {
                    tracing::debug!(connection_id = %id, "Worker exited after failed handshake")
                }
                WorkerExit::Session(outcome) => {
                    tracing::debug!(connection_id = %id, outcome = ?outcome, "Worker exited")
                }
                WorkerExit::Stopped => {
                    tracing::debug!(connection_id = %id, "Worker stopped by host")
                }
            }
        });
    }
}
