//! Length-prefixed framing.
//!
//! A frame is `[u32 big-endian length][length bytes]`. The decoder
//! buffers whatever the socket hands it and only yields a payload once
//! every declared byte has arrived.

use crate::ProtocolError;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Default upper bound on a single frame's payload.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Prefixes `payload` with its length.
///
/// # Errors
/// Returns [`ProtocolError::FrameTooLarge`] if `payload` is longer than
/// `max_frame_len`; the receiving side would reject it anyway.
pub fn encode_frame(payload: &[u8], max_frame_len: usize) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > max_frame_len {
        return Err(ProtocolError::FrameTooLarge {
            len: payload.len(),
            max: max_frame_len,
        });
    }
    let mut out = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Incremental frame decoder.
///
/// Feed it bytes with [`extend`](Self::extend) as they arrive, then pull
/// complete payloads with [`next_frame`](Self::next_frame). A single read
/// may complete zero, one, or many frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_frame_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameDecoder {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_len,
        }
    }

    /// Appends freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Declared length of the frame at the head of the buffer, once its
    /// prefix is readable.
    fn head_len(&self) -> Result<Option<usize>, ProtocolError> {
        let Some(prefix) = self.buf.get(..LENGTH_PREFIX_LEN) else {
            return Ok(None);
        };
        let mut bytes = [0u8; LENGTH_PREFIX_LEN];
        bytes.copy_from_slice(prefix);
        let len = u32::from_be_bytes(bytes) as usize;
        if len > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }
        Ok(Some(len))
    }

    /// Returns `true` if a complete frame is buffered.
    pub fn has_frame(&self) -> Result<bool, ProtocolError> {
        Ok(self
            .head_len()?
            .is_some_and(|len| self.buf.len() >= LENGTH_PREFIX_LEN + len))
    }

    /// Removes and returns the next complete payload, if any.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        let Some(len) = self.head_len()? else {
            return Ok(None);
        };
        let end = LENGTH_PREFIX_LEN + len;
        if self.buf.len() < end {
            return Ok(None);
        }
        let payload = self.buf[LENGTH_PREFIX_LEN..end].to_vec();
        self.buf.drain(..end);
        Ok(Some(payload))
    }

    /// Bytes buffered but not yet returned as frames.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}
