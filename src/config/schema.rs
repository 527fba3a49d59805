//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::{MAX_NAME_LEN, NO_DATA_MAX_COUNT};
use crate::stream::ProtocolLimits;

/// Root configuration for the stream server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Protocol limits and pacing.
    pub protocol: ProtocolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Data seeded into the registry before any client connects.
    pub preload: Vec<PreloadConfig>,

    /// Source → target forwarding performed by the host.
    pub relay: Vec<RelayRoute>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:50091").
    pub bind_address: String,

    /// Maximum concurrent stream connections (one worker thread each).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:50091".to_string(),
            max_connections: 256,
        }
    }
}

/// Protocol limits and worker pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Consecutive zero-byte ticks before a stage gives up.
    pub stall_limit: u32,

    /// Longest accepted stream name, in bytes.
    pub max_name_len: u32,

    /// Largest accepted number of values per cycle.
    pub max_data_size: u32,

    /// Socket read timeout; expiry counts as a zero-byte read.
    pub read_timeout_ms: u64,

    /// Worker sleep after a tick that moved nothing.
    pub idle_tick_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let limits = ProtocolLimits::default();
        Self {
            stall_limit: NO_DATA_MAX_COUNT,
            max_name_len: MAX_NAME_LEN,
            max_data_size: limits.max_data_size,
            read_timeout_ms: 50,
            idle_tick_ms: 10,
        }
    }
}

impl ProtocolConfig {
    pub fn limits(&self) -> ProtocolLimits {
        ProtocolLimits {
            stall_limit: self.stall_limit,
            max_name_len: self.max_name_len,
            max_data_size: self.max_data_size,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Address for the metrics endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9091".to_string(),
        }
    }
}

/// Values made available to a stream before it connects.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreloadConfig {
    /// Stream name the client will negotiate.
    pub name: String,

    /// Values, oldest first.
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Forward everything read from stream `from` to stream `to`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelayRoute {
    pub from: String,
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:50091");
        assert_eq!(config.protocol.limits(), ProtocolLimits::default());
        assert!(config.preload.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:6000"
            max_connections = 8

            [protocol]
            stall_limit = 20
            read_timeout_ms = 5

            [[preload]]
            name = "pop1"
            values = [9.9, 1.5]

            [[relay]]
            from = "a_out"
            to = "b_in"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.max_connections, 8);
        assert_eq!(config.protocol.stall_limit, 20);
        assert_eq!(config.protocol.max_name_len, MAX_NAME_LEN);
        assert_eq!(config.protocol.read_timeout(), Duration::from_millis(5));
        assert_eq!(config.preload[0].values, vec![9.9, 1.5]);
        assert_eq!(
            config.relay,
            vec![RelayRoute {
                from: "a_out".into(),
                to: "b_in".into()
            }]
        );
    }
}
