//! Wire protocol for Parlor.
//!
//! This crate defines what travels between client and server, layered
//! bottom-up:
//!
//! - **Framing** ([`frame`]): `[u32 length][payload]`, decoded
//!   incrementally so a tick never waits on a half-arrived frame.
//! - **Fields** ([`wire`]): big-endian primitives, strings, and lists,
//!   read and written through [`PacketReader`] / [`PacketWriter`].
//! - **Messages** ([`Message`], [`MessageKind`]): the payload catalogue
//!   and its `u16` discriminator registry.
//! - **Codecs** ([`Codec`], [`BinaryCodec`], [`JsonCodec`]): message to
//!   envelope bytes and back.
//! - **Channel** ([`MessageChannel`]): all of the above over one
//!   [`parlor_transport::Connection`].
//!
//! ```text
//! Transport (bytes) → Frame → Codec (Message) → MessageChannel → Room
//! ```
//!
//! It knows nothing about rooms or players; it only moves messages.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod channel;
mod codec;
mod error;
pub mod frame;
mod message;
pub mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use channel::MessageChannel;
pub use codec::{BinaryCodec, Codec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ChannelError, ProtocolError};
pub use frame::{DEFAULT_MAX_FRAME_LEN, FrameDecoder};
pub use message::{
    AvatarData, AvatarJoin, AvatarLeave, ChangeReadyStatusRequest, ChatMessage, ChatRequest,
    Concede, GameNameInit, GoToLobbyRequest, Heartbeat, JoinResult, LobbyInfoUpdate,
    MakeMoveRequest, MakeMoveResult, Message, MessageKind, MoveCommand, MoveRequest,
    PlayerJoinRequest, PlayerJoinResponse, Position, RoomJoinedEvent, RoomKind, TurnUpdate,
};
pub use wire::{PacketReader, PacketWriter, WireFormat};
