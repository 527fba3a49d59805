//! Byte-stream seam between the protocol engine and the network.
//!
//! # Design Decisions
//! - `recv` attempts to fill the whole buffer; the engine only ever sees
//!   "all of it", "none of it" or "some of it and then silence"
//! - Error kinds are classified in one place, see [`classify`]

use std::io;

/// Bidirectional byte stream owned by a single connection.
pub trait Transport: Send {
    /// Attempt to fill `buf`. `Ok(0)` means nothing arrived.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf`, returning how many bytes made it out.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Release the underlying descriptor.
    fn close(&mut self) -> io::Result<()>;
}

/// What a read attempt amounted to.
#[derive(Debug)]
pub(crate) enum Transfer {
    /// Exactly the expected number of bytes.
    Complete,
    /// Nothing yet; counts as a stall.
    Empty,
    /// Some bytes, but not all. Never retried.
    Short(usize),
    /// The peer reset or closed the connection.
    Disconnected(io::Error),
    /// Any other transport error.
    Failed(io::Error),
}

/// Errors meaning the peer has gone away rather than the transport breaking.
pub(crate) fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
    )
}

fn is_no_data(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// Map a `recv` result against the number of bytes asked for.
pub(crate) fn classify(result: io::Result<usize>, expected: usize) -> Transfer {
    match result {
        Ok(n) if n == expected => Transfer::Complete,
        Ok(0) => Transfer::Empty,
        Ok(n) => Transfer::Short(n),
        Err(err) if is_no_data(&err) => Transfer::Empty,
        Err(err) if is_disconnect(&err) => Transfer::Disconnected(err),
        Err(err) => Transfer::Failed(err),
    }
}
