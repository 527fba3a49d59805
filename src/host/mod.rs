//! Host process around the stream engine.
//!
//! # Data Flow
//! ```text
//! Listener::accept
//!     → server.rs (convert socket, register handle, spawn blocking worker)
//!     → worker.rs (handshake, tick until terminal or stop, close)
//!
//! computation side
//!     → table.rs HostHandle (find by name, add/take data, preload registry)
//!     → relay.rs (optional: forward source streams into target streams)
//! ```
//!
//! # Design Decisions
//! - One blocking thread per connection (`spawn_blocking`), async accept loop
//! - The table holds only `StreamHandle`s; sockets stay with their workers

pub mod relay;
pub mod server;
pub mod table;
pub mod worker;

pub use server::StreamServer;
pub use table::{ConnectionTable, DataDestination, HostHandle};
