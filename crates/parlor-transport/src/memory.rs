//! In-process duplex connections.
//!
//! [`pipe`] returns two connected ends. Bytes written on one end become
//! readable on the other, with the same would-block and close semantics
//! as a non-blocking socket.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Connection, ConnectionId, TransportError};

#[derive(Debug, Default)]
struct Pipe {
    bytes: VecDeque<u8>,
    capacity: Option<usize>,
    writer_closed: bool,
    reader_closed: bool,
}

type SharedPipe = Arc<Mutex<Pipe>>;

fn lock(pipe: &SharedPipe) -> MutexGuard<'_, Pipe> {
    pipe.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One end of an in-memory duplex stream.
#[derive(Debug)]
pub struct MemoryConnection {
    id: ConnectionId,
    inbound: SharedPipe,
    outbound: SharedPipe,
    closed: bool,
}

/// Creates a connected pair with unbounded buffers.
pub fn pipe() -> (MemoryConnection, MemoryConnection) {
    build(None)
}

/// Creates a connected pair whose per-direction buffer holds at most
/// `capacity` bytes, so writers see partial writes and would-block.
pub fn pipe_with_capacity(capacity: usize) -> (MemoryConnection, MemoryConnection) {
    build(Some(capacity))
}

fn build(capacity: Option<usize>) -> (MemoryConnection, MemoryConnection) {
    let a_to_b: SharedPipe = Arc::new(Mutex::new(Pipe {
        capacity,
        ..Pipe::default()
    }));
    let b_to_a: SharedPipe = Arc::new(Mutex::new(Pipe {
        capacity,
        ..Pipe::default()
    }));
    let a = MemoryConnection {
        id: ConnectionId::next(),
        inbound: Arc::clone(&b_to_a),
        outbound: Arc::clone(&a_to_b),
        closed: false,
    };
    let b = MemoryConnection {
        id: ConnectionId::next(),
        inbound: a_to_b,
        outbound: b_to_a,
        closed: false,
    };
    (a, b)
}

impl Connection for MemoryConnection {
    fn try_read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(self.id));
        }
        let mut pipe = lock(&self.inbound);
        if pipe.bytes.is_empty() {
            if pipe.writer_closed {
                return Err(TransportError::ConnectionClosed(self.id));
            }
            return Ok(None);
        }
        let n = buf.len().min(pipe.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.bytes.drain(..n)) {
            *slot = byte;
        }
        Ok(Some(n))
    }

    fn try_write(&mut self, data: &[u8]) -> Result<Option<usize>, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(self.id));
        }
        let mut pipe = lock(&self.outbound);
        if pipe.reader_closed {
            return Err(TransportError::SendFailed(
                std::io::ErrorKind::BrokenPipe.into(),
            ));
        }
        let room = match pipe.capacity {
            Some(cap) => cap.saturating_sub(pipe.bytes.len()),
            None => data.len(),
        };
        if room == 0 && !data.is_empty() {
            return Ok(None);
        }
        let n = room.min(data.len());
        pipe.bytes.extend(&data[..n]);
        Ok(Some(n))
    }

    fn is_alive(&self) -> bool {
        if self.closed {
            return false;
        }
        let pipe = lock(&self.inbound);
        !(pipe.writer_closed && pipe.bytes.is_empty())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        lock(&self.outbound).writer_closed = true;
        let mut inbound = lock(&self.inbound);
        inbound.reader_closed = true;
        inbound.bytes.clear();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_carries_bytes_both_ways() {
        let (mut a, mut b) = pipe();
        assert_eq!(a.try_write(b"ping").unwrap(), Some(4));
        assert_eq!(b.try_write(b"pong!").unwrap(), Some(5));

        let mut buf = [0u8; 16];
        assert_eq!(b.try_read(&mut buf).unwrap(), Some(4));
        assert_eq!(&buf[..4], b"ping");
        assert_eq!(a.try_read(&mut buf).unwrap(), Some(5));
        assert_eq!(&buf[..5], b"pong!");
    }

    #[test]
    fn test_try_read_empty_would_block() {
        let (_a, mut b) = pipe();
        let mut buf = [0u8; 8];
        assert_eq!(b.try_read(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_try_read_short_buffer_leaves_remainder() {
        let (mut a, mut b) = pipe();
        a.try_write(b"abcdef").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(b.try_read(&mut buf).unwrap(), Some(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(b.try_read(&mut buf).unwrap(), Some(2));
        assert_eq!(&buf[..2], b"ef");
    }

    #[test]
    fn test_close_drains_then_reports_closed() {
        let (mut a, mut b) = pipe();
        a.try_write(b"bye").unwrap();
        a.close().unwrap();

        // Buffered bytes are still delivered before the close is seen.
        assert!(b.is_alive());
        let mut buf = [0u8; 8];
        assert_eq!(b.try_read(&mut buf).unwrap(), Some(3));
        assert!(!b.is_alive());
        let err = b.try_read(&mut buf).unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_drop_closes_peer() {
        let (a, b) = pipe();
        drop(a);
        assert!(!b.is_alive());
    }

    #[test]
    fn test_write_after_peer_closed_fails() {
        let (mut a, b) = pipe();
        drop(b);
        let err = a.try_write(b"x").unwrap_err();
        assert!(matches!(err, TransportError::SendFailed(_)));
    }

    #[test]
    fn test_closed_end_is_not_alive() {
        let (mut a, _b) = pipe();
        assert!(a.is_alive());
        a.close().unwrap();
        assert!(!a.is_alive());
        // Closing twice is fine.
        a.close().unwrap();
    }

    #[test]
    fn test_capacity_limits_writes() {
        let (mut a, mut b) = pipe_with_capacity(4);
        assert_eq!(a.try_write(b"abcdef").unwrap(), Some(4));
        assert_eq!(a.try_write(b"ef").unwrap(), None);

        let mut buf = [0u8; 2];
        b.try_read(&mut buf).unwrap();
        assert_eq!(a.try_write(b"ef").unwrap(), Some(2));
    }

    #[test]
    fn test_ends_have_distinct_ids() {
        let (a, b) = pipe();
        assert_ne!(a.id(), b.id());
    }
}
