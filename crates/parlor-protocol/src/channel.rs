//! A framed, typed message channel over one polled connection.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parlor_transport::{Connection, ConnectionId, TransportError};

use crate::frame::{DEFAULT_MAX_FRAME_LEN, FrameDecoder, encode_frame};
use crate::{BinaryCodec, ChannelError, Codec, Message};

/// How many bytes one `try_read` call asks the connection for.
const READ_CHUNK: usize = 4096;

/// Outbound bytes a peer may leave unread, in units of the frame limit.
const OUTBOUND_LIMIT_FRAMES: usize = 4;

/// Wraps one [`Connection`] with framing and a [`Codec`].
///
/// Nothing here blocks. Inbound bytes are pulled from the connection
/// whenever [`has_message`](Self::has_message) finds no complete frame
/// already buffered, so partial frames accumulate across ticks. Outbound
/// frames go into a queue that is written until the socket would block;
/// whatever remains goes out on the next send or [`flush`](Self::flush).
///
/// The queue is bounded. A peer that stops reading until a send would
/// overflow it is marked dead: the send fails with
/// [`ChannelError::Backlogged`] and [`is_alive`](Self::is_alive) turns
/// `false`, so the next liveness sweep evicts it.
pub struct MessageChannel {
    conn: Box<dyn Connection>,
    codec: Arc<dyn Codec>,
    decoder: FrameDecoder,
    outbound: Vec<u8>,
    max_frame_len: usize,
    /// A read failure held back until buffered frames are drained.
    read_error: Option<TransportError>,
    read_closed: bool,
    backlogged: bool,
}

impl MessageChannel {
    /// Creates a channel with the given codec and the default frame limit.
    pub fn new(conn: impl Connection, codec: Arc<dyn Codec>) -> Self {
        Self::with_max_frame_len(conn, codec, DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a channel speaking [`BinaryCodec`].
    pub fn binary(conn: impl Connection) -> Self {
        Self::new(conn, Arc::new(BinaryCodec))
    }

    pub fn with_max_frame_len(
        conn: impl Connection,
        codec: Arc<dyn Codec>,
        max_frame_len: usize,
    ) -> Self {
        Self {
            conn: Box::new(conn),
            codec,
            decoder: FrameDecoder::new(max_frame_len),
            outbound: Vec::new(),
            max_frame_len,
            read_error: None,
            read_closed: false,
            backlogged: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.conn.peer_addr()
    }

    /// Drains everything the connection has for us right now.
    fn fill(&mut self) {
        if self.read_error.is_some() || self.read_closed {
            return;
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.conn.try_read(&mut chunk) {
                Ok(Some(n)) => self.decoder.extend(&chunk[..n]),
                Ok(None) => break,
                Err(e) => {
                    self.read_error = Some(e);
                    break;
                }
            }
        }
    }

    /// Returns `true` if a complete message is ready to be received.
    ///
    /// # Errors
    /// - a fatal framing error (oversized length prefix);
    /// - the read side failed or the peer closed, reported only once every
    ///   frame that arrived before the close has been received.
    pub fn has_message(&mut self) -> Result<bool, ChannelError> {
        if self.decoder.has_frame()? {
            return Ok(true);
        }
        self.fill();
        if self.decoder.has_frame()? {
            return Ok(true);
        }
        if let Some(err) = self.read_error.take() {
            self.read_closed = true;
            return Err(err.into());
        }
        if self.read_closed {
            return Err(TransportError::ConnectionClosed(self.id()).into());
        }
        Ok(false)
    }

    /// Takes the next complete message.
    ///
    /// Call only after [`has_message`](Self::has_message) returned
    /// `true`. An unknown discriminator consumes its frame and yields a
    /// non-fatal error; the next call moves on to the following frame.
    pub fn receive_message(&mut self) -> Result<Message, ChannelError> {
        let frame = self.decoder.next_frame()?.ok_or(ChannelError::NoMessage)?;
        Ok(self.codec.decode(&frame)?)
    }

    /// Encodes, frames, and writes one message.
    ///
    /// Write errors are returned, never swallowed. A frame the socket
    /// can't take in full right now stays queued and is flushed, in
    /// order, before anything sent later.
    ///
    /// # Errors
    /// [`ChannelError::Backlogged`] once the unsent queue would grow past
    /// its limit. The frame is not queued and the channel stays dead.
    pub fn send_message(&mut self, message: &Message) -> Result<(), ChannelError> {
        if self.backlogged {
            return Err(ChannelError::Backlogged(self.outbound.len()));
        }
        let envelope = self.codec.encode(message)?;
        let frame = encode_frame(&envelope, self.max_frame_len)?;
        self.flush()?;
        if self.outbound.len() + frame.len() > self.outbound_limit() {
            self.backlogged = true;
            tracing::debug!(conn_id = %self.id(), pending = self.outbound.len(), "outbound queue full");
            return Err(ChannelError::Backlogged(self.outbound.len()));
        }
        self.outbound.extend_from_slice(&frame);
        self.flush()
    }

    fn outbound_limit(&self) -> usize {
        self.max_frame_len.saturating_mul(OUTBOUND_LIMIT_FRAMES)
    }

    /// Writes queued outbound bytes until the connection would block.
    pub fn flush(&mut self) -> Result<(), ChannelError> {
        while !self.outbound.is_empty() {
            match self.conn.try_write(&self.outbound)? {
                Some(n) => {
                    self.outbound.drain(..n);
                }
                None => break,
            }
        }
        Ok(())
    }

    /// Bytes queued but not yet accepted by the connection.
    pub fn pending_outbound(&self) -> usize {
        self.outbound.len()
    }

    /// Liveness probe: `false` once the peer has closed, a read failed,
    /// or the outbound queue overflowed.
    pub fn is_alive(&self) -> bool {
        self.read_error.is_none() && !self.read_closed && !self.backlogged && self.conn.is_alive()
    }

    /// Flushes what it can, then closes the connection.
    pub fn close(&mut self) -> Result<(), ChannelError> {
        if let Err(e) = self.flush() {
            tracing::debug!(conn_id = %self.id(), error = %e, "flush before close failed");
        }
        self.read_closed = true;
        self.conn.close()?;
        Ok(())
    }
}

impl fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannel")
            .field("id", &self.id())
            .field("codec", &self.codec.name())
            .field("buffered", &self.decoder.buffered_len())
            .field("pending_outbound", &self.outbound.len())
            .finish()
    }
}
