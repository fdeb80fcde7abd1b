//! Codec trait and implementations.
//!
//! A codec turns a [`Message`] into envelope bytes and back. Framing is
//! not its concern: the [`MessageChannel`](crate::MessageChannel) adds
//! and strips the length prefix around whatever the codec produces.
//!
//! [`BinaryCodec`] is the production format: the hand-written field
//! layout from [`crate::wire`]. [`JsonCodec`] (feature `json`, on by
//! default) speaks serde JSON instead, which is handy when poking a
//! server with a scripted client and reading frames by eye.

use crate::{Message, ProtocolError};
#[cfg(feature = "json")]
use crate::MessageKind;

/// Converts messages to envelope bytes and back.
///
/// The trait is object-safe so a server can pick its codec at startup
/// from configuration and share it as `Arc<dyn Codec>` across every
/// channel.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into an envelope.
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError>;

    /// Parses one envelope.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownMessageType`] or
    /// [`ProtocolError::UnknownMessageName`] if the envelope names no
    /// known payload; any other error means the bytes are malformed.
    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// BinaryCodec
// ---------------------------------------------------------------------------

/// The `[u16 discriminator][fields]` envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        Ok(message.to_envelope())
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        Message::from_envelope(data)
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Serde JSON envelopes, externally tagged by payload name:
///
/// ```rust
/// use parlor_protocol::{Codec, JsonCodec, Message, TurnUpdate};
///
/// let codec = JsonCodec;
/// let msg = Message::from(TurnUpdate { current_player_id: 1 });
///
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(bytes, br#"{"TurnUpdate":{"current_player_id":1}}"#);
/// assert_eq!(codec.decode(&bytes).unwrap(), msg);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(message).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        let value: serde_json::Value = serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
        // A well-formed envelope is an object with one key, the payload
        // name. Anything else falls through to serde's own error.
        let unknown = value
            .as_object()
            .filter(|object| object.len() == 1)
            .and_then(|object| object.keys().next())
            .filter(|name| !MessageKind::ALL.iter().any(|kind| kind.to_string() == **name));
        if let Some(name) = unknown {
            return Err(ProtocolError::UnknownMessageName(name.clone()));
        }
        serde_json::from_value(value).map_err(ProtocolError::Decode)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, Heartbeat, MakeMoveResult};

    #[test]
    fn test_binary_codec_round_trip() {
        let codec = BinaryCodec;
        let msg = Message::from(MakeMoveResult {
            mover: 2,
            board: [0, 2, 0, 0, 1, 0, 0, 0, 0],
        });
        let bytes = codec.encode(&msg).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_binary_codec_unknown_type() {
        let err = BinaryCodec.decode(&[0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(0xffff)));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let msg = Message::from(ChatMessage::notice("Alice won against Bob."));
        let bytes = codec.encode(&msg).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), msg);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_unit_payload() {
        let bytes = JsonCodec.encode(&Message::from(Heartbeat)).unwrap();
        assert_eq!(bytes, br#"{"Heartbeat":null}"#);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_rejects_garbage() {
        let err = JsonCodec.decode(b"not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.is_fatal());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_unknown_name_is_not_fatal() {
        let err = JsonCodec.decode(br#"{"Bogus":null}"#).unwrap_err();
        assert!(matches!(&err, ProtocolError::UnknownMessageName(name) if name == "Bogus"));
        assert!(!err.is_fatal());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_codec_known_name_bad_fields_is_fatal() {
        let err = JsonCodec.decode(br#"{"TurnUpdate":{"nope":1}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_codec_is_object_safe() {
        let codecs: Vec<Box<dyn Codec>> = vec![
            Box::new(BinaryCodec),
            #[cfg(feature = "json")]
            Box::new(JsonCodec),
        ];
        for codec in codecs {
            let bytes = codec.encode(&Heartbeat.into()).unwrap();
            assert_eq!(codec.decode(&bytes).unwrap(), Message::Heartbeat(Heartbeat));
        }
    }
}
