//! Non-blocking TCP transport.
//!
//! The listener is created through `tokio::net::TcpSocket` so the accept
//! backlog is explicit, then converted into a non-blocking
//! `std::net::TcpListener`. From then on everything is plain polled I/O:
//! the tick loop asks, the socket answers immediately.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tokio::net::TcpSocket;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// A TCP [`Transport`] that accepts without blocking.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a listener to `addr` with the given accept backlog.
    ///
    /// Must be called from within a Tokio runtime (address resolution
    /// and socket setup go through Tokio).
    pub async fn bind(addr: &str, backlog: u32) -> Result<Self, TransportError> {
        let socket_addr = tokio::net::lookup_host(addr)
            .await
            .map_err(TransportError::BindFailed)?
            .next()
            .ok_or_else(|| {
                TransportError::BindFailed(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("{addr} did not resolve to any address"),
                ))
            })?;

        let socket = if socket_addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(TransportError::BindFailed)?;
        socket
            .set_reuseaddr(true)
            .map_err(TransportError::BindFailed)?;
        socket
            .bind(socket_addr)
            .map_err(TransportError::BindFailed)?;
        let listener = socket
            .listen(backlog)
            .map_err(TransportError::BindFailed)?
            .into_std()
            .map_err(TransportError::BindFailed)?;
        listener
            .set_nonblocking(true)
            .map_err(TransportError::BindFailed)?;

        let local = listener.local_addr().map_err(TransportError::BindFailed)?;
        tracing::info!(addr = %local, backlog, "TCP transport listening");
        Ok(Self { listener })
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    fn try_accept(&mut self) -> Result<Option<Self::Connection>, TransportError> {
        match self.listener.accept() {
            Ok((stream, addr)) => {
                let conn = TcpConnection::from_stream(stream)?;
                tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
                Ok(Some(conn))
            }
            Err(e) if would_block(&e) => Ok(None),
            Err(e) => Err(TransportError::AcceptFailed(e)),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// A single non-blocking TCP stream.
pub struct TcpConnection {
    id: ConnectionId,
    stream: TcpStream,
    peer: Option<SocketAddr>,
    closed: bool,
}

impl TcpConnection {
    /// Wraps an already-connected stream, switching it to non-blocking
    /// mode. Accepted sockets don't inherit the listener's mode.
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream
            .set_nonblocking(true)
            .map_err(TransportError::AcceptFailed)?;
        let peer = stream.peer_addr().ok();
        // Small frames; latency matters more than coalescing.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = ?peer, error = %e, "set_nodelay failed");
        }
        Ok(Self {
            id: ConnectionId::next(),
            stream,
            peer,
            closed: false,
        })
    }

    /// Client side: connects (blocking until the handshake completes),
    /// then switches to non-blocking mode.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(TransportError::ConnectFailed)?;
        Self::from_stream(stream)
    }
}

impl Connection for TcpConnection {
    fn try_read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(self.id));
        }
        match self.stream.read(buf) {
            Ok(0) if !buf.is_empty() => Err(TransportError::ConnectionClosed(self.id)),
            Ok(n) => Ok(Some(n)),
            Err(e) if would_block(&e) => Ok(None),
            Err(e) => Err(TransportError::ReceiveFailed(e)),
        }
    }

    fn try_write(&mut self, data: &[u8]) -> Result<Option<usize>, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(self.id));
        }
        match self.stream.write(data) {
            Ok(0) if !data.is_empty() => Err(TransportError::SendFailed(
                io::ErrorKind::WriteZero.into(),
            )),
            Ok(n) => Ok(Some(n)),
            Err(e) if would_block(&e) => Ok(None),
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    fn is_alive(&self) -> bool {
        if self.closed {
            return false;
        }
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if would_block(&e) => true,
            Err(_) => false,
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

fn would_block(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
