//! Transport abstraction layer for Parlor.
//!
//! Provides the [`Transport`] and [`Connection`] traits over a polled,
//! non-blocking byte stream. Nothing in this crate ever blocks: a read
//! with no data available returns `Ok(None)`, a write that would block
//! returns `Ok(None)`, and an accept with nothing pending returns
//! `Ok(None)`. The server's single tick loop relies on that.
//!
//! # Implementations
//!
//! - [`TcpTransport`] / [`TcpConnection`]: real sockets (feature `tcp`, default)
//! - [`memory::pipe`]: an in-process duplex pair with the same contract,
//!   used by tests and by embedders that don't want sockets

mod error;
pub mod memory;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
pub use memory::MemoryConnection;
#[cfg(feature = "tcp")]
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating process-unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
///
/// Identity is minted once when the connection object is created and
/// never reused, so it can key per-connection side tables safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Mints the next unused id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections without blocking.
pub trait Transport: Send + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Accepts one pending connection, or returns `Ok(None)` if none is
    /// waiting right now.
    fn try_accept(&mut self) -> Result<Option<Self::Connection>, TransportError>;

    /// The address this transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// A single bidirectional byte stream, driven by polling.
pub trait Connection: Send + 'static {
    /// Reads whatever is currently available into `buf`.
    ///
    /// - `Ok(Some(n))`: `n > 0` bytes were read
    /// - `Ok(None)`: nothing available yet; try again next tick
    /// - `Err(ConnectionClosed)`: the peer closed the stream
    fn try_read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError>;

    /// Writes as much of `data` as the stream accepts right now.
    ///
    /// Returns `Ok(None)` if the stream would block before taking any
    /// byte. Partial writes are reported as `Ok(Some(n))` with
    /// `n < data.len()`; the caller keeps the remainder.
    fn try_write(&mut self, data: &[u8]) -> Result<Option<usize>, TransportError>;

    /// Liveness probe: a zero-length peek on an idle stream.
    ///
    /// Returns `false` once the peer has performed an orderly close and
    /// no unread bytes remain, or after [`close`](Self::close).
    fn is_alive(&self) -> bool;

    /// Closes the stream. Closing twice is not an error.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The remote address, if the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn try_read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        (**self).try_read(buf)
    }

    fn try_write(&mut self, data: &[u8]) -> Result<Option<usize>, TransportError> {
        (**self).try_write(data)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn id(&self) -> ConnectionId {
        (**self).id()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        (**self).peer_addr()
    }
}
