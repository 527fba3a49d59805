//! Startup orchestration.
//!
//! # Responsibilities
//! - Seed the registry from `[[preload]]`
//! - Bind the listener and start the accept loop
//! - Start the relay when routes are configured
//!
//! # Design Decisions
//! - Fail fast: a bind error aborts startup before any task is spawned
//! - The listener binds last (traffic only when the registry is seeded)

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::shutdown::{self, Shutdown};
use crate::config::ServerConfig;
use crate::host::relay::run_relay;
use crate::host::{HostHandle, StreamServer};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::stream::DataCache;

/// A started server and the handles needed to use and stop it.
pub struct RunningServer {
    local_addr: SocketAddr,
    host: HostHandle,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    server_task: JoinHandle<()>,
    relay_task: Option<JoinHandle<()>>,
}

/// Start the stream server described by `config`.
///
/// Must be called from within a tokio runtime.
pub async fn start(config: &ServerConfig) -> Result<RunningServer, ListenerError> {
    let cache = DataCache::new();
    for preload in &config.preload {
        cache.preload(&preload.name, &preload.values);
        tracing::info!(
            stream = %preload.name,
            values = preload.values.len(),
            "Registry seeded"
        );
    }

    let listener = Listener::bind(&config.listener).await?;
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

    let shutdown = Shutdown::new();
    let server = StreamServer::new(&config.protocol, cache, &shutdown);
    let host = server.host();
    let tracker = server.tracker();

    let relay_task = if config.relay.is_empty() {
        None
    } else {
        Some(tokio::spawn(run_relay(
            host.clone(),
            config.relay.clone(),
            config.protocol.idle_tick(),
            shutdown.subscribe(),
        )))
    };
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Ok(RunningServer {
        local_addr,
        host,
        shutdown,
        tracker,
        server_task,
        relay_task,
    })
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn host(&self) -> &HostHandle {
        &self.host
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Stop accepting, stop every worker, and wait for background tasks.
    ///
    /// Returns `true` if every worker exited before `deadline`.
    pub async fn stop(self, deadline: Duration) -> bool {
        let drained = shutdown::stop(&self.shutdown, &self.tracker, deadline).await;
        if let Err(e) = self.server_task.await {
            tracing::error!(error = %e, "Accept loop task failed");
        }
        if let Some(relay) = self.relay_task {
            if let Err(e) = relay.await {
                tracing::error!(error = %e, "Relay task failed");
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ListenerConfig, PreloadConfig};

    #[tokio::test]
    async fn start_seeds_registry_and_stops() {
        let config = ServerConfig {
            listener: ListenerConfig {
                bind_address: "127.0.0.1:0".into(),
                max_connections: 4,
            },
            preload: vec![PreloadConfig {
                name: "pop1".into(),
                values: vec![9.9],
            }],
            ..ServerConfig::default()
        };

        let running = start(&config).await.unwrap();
        assert_ne!(running.local_addr().port(), 0);
        assert_eq!(running.host().registry().pending("pop1"), 1);
        assert!(running.stop(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn bad_bind_address_fails() {
        let config = ServerConfig {
            listener: ListenerConfig {
                bind_address: "not-an-address".into(),
                max_connections: 4,
            },
            ..ServerConfig::default()
        };
        assert!(matches!(start(&config).await, Err(ListenerError::Bind(_))));
    }
}
