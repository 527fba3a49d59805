//! SpineML network stream server.
//!
//! Serves the SpineML TCP streaming protocol: remote components connect,
//! negotiate a named stream of fixed-size batches of doubles, then exchange
//! batches under a one-ack-per-batch flow control.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  STREAM SERVER                   │
//!                      │                                                  │
//!   remote component   │  ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ───────────────────┼─▶│   net    │──▶│   host   │──▶│   stream    │   │
//!                      │  │ listener │   │  worker  │   │ handshake + │   │
//!                      │  └──────────┘   │ (thread) │   │ steady I/O  │   │
//!                      │                 └──────────┘   └──────┬──────┘   │
//!                      │                                       │          │
//!                      │                                       ▼          │
//!   computation side   │  ┌──────────────┐             ┌─────────────┐    │
//!   ◀──────────────────┼─▶│ HostHandle / │◀───────────▶│ FifoBuffer  │    │
//!                      │  │    relay     │             │ (per conn)  │    │
//!                      │  └──────────────┘             └─────────────┘    │
//!                      │                                                  │
//!                      │  config · lifecycle · observability · protocol   │
//!                      └──────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod host;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod stream;

pub use config::schema::ServerConfig;
pub use host::{HostHandle, StreamServer};
pub use lifecycle::{RunningServer, Shutdown};
pub use stream::{DataCache, StreamConnection, StreamHandle};
