//! Blocking client for the SpineML network stream protocol.
//!
//! ```no_run
//! use spineml_client::{Client, Role};
//!
//! let mut client = Client::connect("127.0.0.1:50091", Role::Source, 2, "pop1")?;
//! client.send_batch(&[0.5, 1.5])?;
//! # Ok::<(), spineml_client::ClientError>(())
//! ```

pub mod client;
pub mod error;
pub mod wire;

pub use client::{Client, Role};
pub use error::ClientError;
