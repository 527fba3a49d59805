//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! stream engine, host, listener produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (connection_id, stream, direction) on every event
//! - Metrics are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
