//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Seed registry → Bind listener → Spawn accept loop (+ relay)
//!
//! Shutdown (shutdown.rs):
//!     stop() → raise stop flag + broadcast → acceptor exits,
//!     workers close their sockets → wait for tracker to drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop()
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, stop workers, drain
//! - Shutdown has a deadline: stop() reports whether the drain finished

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{stop, Shutdown};
pub use startup::{start, RunningServer};
