//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (id assignment, active-connection tracking)
//!     → tcp.rs (blocking socket behind the stream Transport seam)
//!     → Hand off to a stream worker
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked so shutdown can wait for workers to drain
//! - Accepting is async; per-connection I/O is blocking on its own thread

pub mod connection;
pub mod listener;
pub mod tcp;
