//! Shared utilities for integration tests.

use std::time::Duration;

use spineml_net::config::{ListenerConfig, ProtocolConfig, ServerConfig};
use spineml_net::lifecycle::{start, RunningServer};

/// Loopback config with a generous stall ceiling so slow CI does not end
/// sessions before the test drives them.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        listener: ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            max_connections: 16,
        },
        protocol: ProtocolConfig {
            stall_limit: 2000,
            read_timeout_ms: 10,
            idle_tick_ms: 1,
            ..ProtocolConfig::default()
        },
        ..ServerConfig::default()
    }
}

pub async fn start_server(config: ServerConfig) -> RunningServer {
    start(&config).await.unwrap()
}

/// Poll `check` until it holds or `timeout` passes.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(check: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
