//! Error types for the protocol layer.
//!
//! Two enums live here. [`ProtocolError`] is about bytes: framing,
//! field decoding, the discriminator lookup. [`ChannelError`] is what a
//! [`MessageChannel`](crate::MessageChannel) surfaces, combining protocol
//! and transport failures.

use parlor_transport::TransportError;

/// Errors produced while framing, encoding, or decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A length prefix announced more bytes than the configured maximum.
    ///
    /// Raised as soon as the 4-byte prefix is readable, before any of the
    /// payload is buffered, so a hostile peer can't make us allocate.
    #[error("frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// A field read ran past the end of the frame.
    #[error("truncated payload: needed {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    /// Bytes were left over after every field of the payload was read.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),

    /// A boolean field held something other than 0 or 1.
    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A list or board count was negative or otherwise impossible.
    #[error("invalid element count {0}")]
    InvalidCount(i32),

    /// An enumerated field held a value outside its range.
    #[error("invalid {name} value {value}")]
    InvalidEnum { name: &'static str, value: i32 },

    /// The envelope's discriminator maps to no known payload.
    ///
    /// This is the one decode failure a connection survives: the frame
    /// boundary is intact, so the frame is simply dropped.
    #[error("unknown message type {0}")]
    UnknownMessageType(u16),

    /// A JSON envelope is tagged with a payload name we don't know.
    /// Survivable for the same reason as [`Self::UnknownMessageType`].
    #[error("unknown message name {0:?}")]
    UnknownMessageName(String),

    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// JSON deserialization failed.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

impl ProtocolError {
    /// Returns `true` if the connection that produced this error can no
    /// longer be trusted and must be closed.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::UnknownMessageType(_) | Self::UnknownMessageName(_)
        )
    }
}

/// Errors surfaced by a [`MessageChannel`](crate::MessageChannel).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `receive_message` was called with no complete frame buffered.
    #[error("no complete message buffered")]
    NoMessage,

    /// The peer left too many bytes unread. Carries the queued count.
    #[error("outbound queue full with {0} bytes unsent")]
    Backlogged(usize),
}

impl ChannelError {
    /// Returns `true` if the channel should be evicted.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Protocol(e) => e.is_fatal(),
            Self::NoMessage => false,
            Self::Backlogged(_) => true,
        }
    }
}
