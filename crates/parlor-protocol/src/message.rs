//! The message catalogue.
//!
//! Each payload is a plain struct with a hand-written [`WireFormat`]
//! impl. The [`message_registry!`] invocation at the bottom ties every
//! payload to its `u16` discriminator and generates:
//!
//! - [`MessageKind`], the fieldless enum of discriminators;
//! - [`Message`], the sum type rooms match on;
//! - `From<Payload> for Message` for every payload.
//!
//! The envelope is `[u16 discriminator][payload fields]`. Decoding looks
//! the discriminator up once and never inspects it again; after that,
//! routing is an ordinary `match` on [`Message`].

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::wire::{PacketReader, PacketWriter, WireFormat};

// ---------------------------------------------------------------------------
// Shared field types
// ---------------------------------------------------------------------------

/// Outcome of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinResult {
    Accepted,
    Denied,
}

/// The rooms a client can be told it has entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    Login,
    Lobby,
    Game,
    GameOver,
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Login => "login",
            Self::Lobby => "lobby",
            Self::Game => "game",
            Self::GameOver => "game-over",
        })
    }
}

/// A point in the lobby arena.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One roster entry in an [`AvatarJoin`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarData {
    pub id: i32,
    pub appearance: i32,
    pub position: Position,
}

impl WireFormat for JoinResult {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(match self {
            Self::Accepted => 0,
            Self::Denied => 1,
        });
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        match r.read_i32()? {
            0 => Ok(Self::Accepted),
            1 => Ok(Self::Denied),
            value => Err(ProtocolError::InvalidEnum {
                name: "JoinResult",
                value,
            }),
        }
    }
}

impl WireFormat for RoomKind {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(match self {
            Self::Login => 0,
            Self::Lobby => 1,
            Self::Game => 2,
            Self::GameOver => 3,
        });
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        match r.read_i32()? {
            0 => Ok(Self::Login),
            1 => Ok(Self::Lobby),
            2 => Ok(Self::Game),
            3 => Ok(Self::GameOver),
            value => Err(ProtocolError::InvalidEnum {
                name: "RoomKind",
                value,
            }),
        }
    }
}

impl WireFormat for Position {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_f32(self.x);
        w.write_f32(self.y);
        w.write_f32(self.z);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            x: r.read_f32()?,
            y: r.read_f32()?,
            z: r.read_f32()?,
        })
    }
}

impl WireFormat for AvatarData {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.id);
        w.write_i32(self.appearance);
        self.position.write_to(w);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            appearance: r.read_i32()?,
            position: Position::read_from(r)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Client → Server: the nickname to log in with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinRequest {
    pub name: String,
}

/// Server → Client: whether the nickname was accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinResponse {
    pub result: JoinResult,
}

/// Server → Client: sent on entering any room after login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomJoinedEvent {
    pub room: RoomKind,
}

impl WireFormat for PlayerJoinRequest {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_str(&self.name);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: r.read_string()?,
        })
    }
}

impl WireFormat for PlayerJoinResponse {
    fn write_to(&self, w: &mut PacketWriter) {
        self.result.write_to(w);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            result: JoinResult::read_from(r)?,
        })
    }
}

impl WireFormat for RoomJoinedEvent {
    fn write_to(&self, w: &mut PacketWriter) {
        self.room.write_to(w);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            room: RoomKind::read_from(r)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// Client → Server: toggle readiness for the next game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReadyStatusRequest {
    pub ready: bool,
}

/// Server → Client: lobby headcount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyInfoUpdate {
    pub member_count: i32,
    pub ready_count: i32,
}

/// Client → Server: a line of chat, optionally whispered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    pub whisper: bool,
}

/// Server → Client: a line of chat. `sender_id` is 0 for server notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: i32,
    pub text: String,
    pub whisper: bool,
}

impl ChatMessage {
    /// A notice from the server itself.
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            sender_id: 0,
            text: text.into(),
            whisper: false,
        }
    }
}

/// Client → Server: move my avatar here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Server → Client: an avatar moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub actor_id: i32,
}

/// Server → Client: an avatar entered, plus the full current roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarJoin {
    pub id: i32,
    pub appearance: i32,
    pub position: Position,
    pub roster: Vec<AvatarData>,
}

/// Server → Client: an avatar left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarLeave {
    pub id: i32,
}

impl WireFormat for ChangeReadyStatusRequest {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_bool(self.ready);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            ready: r.read_bool()?,
        })
    }
}

impl WireFormat for LobbyInfoUpdate {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.member_count);
        w.write_i32(self.ready_count);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            member_count: r.read_i32()?,
            ready_count: r.read_i32()?,
        })
    }
}

impl WireFormat for ChatRequest {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_str(&self.text);
        w.write_bool(self.whisper);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            text: r.read_string()?,
            whisper: r.read_bool()?,
        })
    }
}

impl WireFormat for ChatMessage {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.sender_id);
        w.write_str(&self.text);
        w.write_bool(self.whisper);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            sender_id: r.read_i32()?,
            text: r.read_string()?,
            whisper: r.read_bool()?,
        })
    }
}

impl WireFormat for MoveRequest {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_f32(self.x);
        w.write_f32(self.y);
        w.write_f32(self.z);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            x: r.read_f32()?,
            y: r.read_f32()?,
            z: r.read_f32()?,
        })
    }
}

impl WireFormat for MoveCommand {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_f32(self.x);
        w.write_f32(self.y);
        w.write_f32(self.z);
        w.write_i32(self.actor_id);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            x: r.read_f32()?,
            y: r.read_f32()?,
            z: r.read_f32()?,
            actor_id: r.read_i32()?,
        })
    }
}

impl WireFormat for AvatarJoin {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.id);
        w.write_i32(self.appearance);
        self.position.write_to(w);
        w.write_list(&self.roster);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            appearance: r.read_i32()?,
            position: Position::read_from(r)?,
            roster: r.read_list()?,
        })
    }
}

impl WireFormat for AvatarLeave {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.id);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { id: r.read_i32()? })
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Client → Server: mark a cell (0..9, row-major).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeMoveRequest {
    pub cell: i32,
}

/// Server → Client: a move was applied. `board` holds 0 for empty, 1 or
/// 2 for the player who marked the cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeMoveResult {
    pub mover: i32,
    pub board: [i32; 9],
}

/// Server → Client: whose turn it is (1 or 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnUpdate {
    pub current_player_id: i32,
}

/// Server → Client: the two nicknames, in seat order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameNameInit {
    pub player1: String,
    pub player2: String,
}

impl WireFormat for MakeMoveRequest {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.cell);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            cell: r.read_i32()?,
        })
    }
}

impl WireFormat for MakeMoveResult {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.mover);
        for cell in self.board {
            w.write_i32(cell);
        }
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        let mover = r.read_i32()?;
        let mut board = [0i32; 9];
        for cell in &mut board {
            *cell = r.read_i32()?;
        }
        Ok(Self { mover, board })
    }
}

impl WireFormat for TurnUpdate {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_i32(self.current_player_id);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            current_player_id: r.read_i32()?,
        })
    }
}

impl WireFormat for GameNameInit {
    fn write_to(&self, w: &mut PacketWriter) {
        w.write_str(&self.player1);
        w.write_str(&self.player2);
    }

    fn read_from(r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player1: r.read_string()?,
            player2: r.read_string()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Signals (no fields)
// ---------------------------------------------------------------------------

/// Client → Server: keep-alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Heartbeat;

/// Client → Server: give up the current game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Concede;

/// Client → Server: leave the game-over screen for the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoToLobbyRequest;

macro_rules! empty_wire_format {
    ($($name:ident),*) => {
        $(
            impl WireFormat for $name {
                fn write_to(&self, _w: &mut PacketWriter) {}

                fn read_from(_r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
                    Ok(Self)
                }
            }
        )*
    };
}

empty_wire_format!(Heartbeat, Concede, GoToLobbyRequest);

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Generates the discriminator enum, the [`Message`] sum type, and the
/// envelope encode/decode dispatch from one `id => Payload` table.
///
/// Adding a payload means one line here plus its `WireFormat` impl. An
/// id used twice is a compile error (unreachable pattern in
/// `from_discriminator` is denied below).
macro_rules! message_registry {
    ($($id:literal => $name:ident),* $(,)?) => {
        /// Discriminator of every payload on the wire.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum MessageKind {
            $($name,)*
        }

        impl MessageKind {
            /// All kinds, in discriminator order.
            pub const ALL: &'static [MessageKind] = &[$(MessageKind::$name,)*];

            /// The `u16` written at the head of every envelope.
            pub fn discriminator(self) -> u16 {
                match self {
                    $(Self::$name => $id,)*
                }
            }

            #[deny(unreachable_patterns)]
            pub fn from_discriminator(id: u16) -> Option<Self> {
                match id {
                    $($id => Some(Self::$name),)*
                    _ => None,
                }
            }
        }

        /// Any payload, tagged by kind.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Message {
            $($name($name),)*
        }

        impl Message {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Self::$name(_) => MessageKind::$name,)*
                }
            }

            fn write_fields(&self, w: &mut PacketWriter) {
                match self {
                    $(Self::$name(m) => m.write_to(w),)*
                }
            }

            fn read_fields(kind: MessageKind, r: &mut PacketReader<'_>) -> Result<Self, ProtocolError> {
                match kind {
                    $(MessageKind::$name => $name::read_from(r).map(Self::$name),)*
                }
            }
        }

        $(
            impl From<$name> for Message {
                fn from(m: $name) -> Self {
                    Self::$name(m)
                }
            }
        )*
    };
}

message_registry! {
    1 => PlayerJoinRequest,
    2 => PlayerJoinResponse,
    3 => RoomJoinedEvent,
    4 => ChangeReadyStatusRequest,
    5 => LobbyInfoUpdate,
    6 => ChatRequest,
    7 => ChatMessage,
    8 => MoveRequest,
    9 => MoveCommand,
    10 => AvatarJoin,
    11 => AvatarLeave,
    12 => MakeMoveRequest,
    13 => MakeMoveResult,
    14 => TurnUpdate,
    15 => GameNameInit,
    16 => Heartbeat,
    17 => Concede,
    18 => GoToLobbyRequest,
}

impl Message {
    /// Serializes to an envelope: discriminator, then fields.
    pub fn to_envelope(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        w.write_u16(self.kind().discriminator());
        self.write_fields(&mut w);
        w.into_bytes()
    }

    /// Parses an envelope produced by [`to_envelope`](Self::to_envelope).
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownMessageType`] for an unregistered
    ///   discriminator (the only non-fatal case);
    /// - [`ProtocolError::TrailingBytes`] if the payload's fields don't
    ///   consume the whole envelope;
    /// - any field-level decode error.
    pub fn from_envelope(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = PacketReader::new(bytes);
        let id = r.read_u16()?;
        let kind = MessageKind::from_discriminator(id).ok_or(ProtocolError::UnknownMessageType(id))?;
        let message = Self::read_fields(kind, &mut r)?;
        r.finish()?;
        Ok(message)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One representative value per payload.
    fn samples() -> Vec<Message> {
        vec![
            PlayerJoinRequest { name: "Alice".into() }.into(),
            PlayerJoinResponse { result: JoinResult::Denied }.into(),
            RoomJoinedEvent { room: RoomKind::GameOver }.into(),
            ChangeReadyStatusRequest { ready: true }.into(),
            LobbyInfoUpdate { member_count: 3, ready_count: 1 }.into(),
            ChatRequest { text: "psst".into(), whisper: true }.into(),
            ChatMessage { sender_id: 4, text: "Alice: hi".into(), whisper: false }.into(),
            MoveRequest { x: 1.0, y: 0.0, z: -2.5 }.into(),
            MoveCommand { x: 1.0, y: 0.0, z: -2.5, actor_id: 4 }.into(),
            AvatarJoin {
                id: 4,
                appearance: 2,
                position: Position::new(3.0, 0.0, 7.5),
                roster: vec![
                    AvatarData { id: 1, appearance: 1, position: Position::new(0.0, 0.0, 0.0) },
                    AvatarData { id: 4, appearance: 2, position: Position::new(3.0, 0.0, 7.5) },
                ],
            }
            .into(),
            AvatarLeave { id: 4 }.into(),
            MakeMoveRequest { cell: 8 }.into(),
            MakeMoveResult { mover: 1, board: [1, 2, 2, 0, 1, 0, 0, 0, 1] }.into(),
            TurnUpdate { current_player_id: 2 }.into(),
            GameNameInit { player1: "Alice".into(), player2: "Bob".into() }.into(),
            Heartbeat.into(),
            Concede.into(),
            GoToLobbyRequest.into(),
        ]
    }

    #[test]
    fn test_samples_cover_every_kind() {
        let kinds: Vec<_> = samples().iter().map(Message::kind).collect();
        assert_eq!(kinds, MessageKind::ALL);
    }

    #[test]
    fn test_envelope_round_trip_every_payload() {
        for msg in samples() {
            let bytes = msg.to_envelope();
            let decoded = Message::from_envelope(&bytes).unwrap();
            assert_eq!(decoded, msg, "round trip failed for {}", msg.kind());
        }
    }

    #[test]
    fn test_discriminators_are_unique_and_stable() {
        for (i, kind) in MessageKind::ALL.iter().enumerate() {
            assert_eq!(kind.discriminator(), i as u16 + 1);
            assert_eq!(MessageKind::from_discriminator(kind.discriminator()), Some(*kind));
        }
        assert_eq!(MessageKind::from_discriminator(0), None);
    }

    #[test]
    fn test_envelope_layout_for_join_request() {
        let bytes = Message::from(PlayerJoinRequest { name: "Al".into() }).to_envelope();
        assert_eq!(bytes, vec![0, 1, 0, 0, 0, 2, b'A', b'l']);
    }

    #[test]
    fn test_empty_payload_is_just_the_discriminator() {
        assert_eq!(Message::from(Heartbeat).to_envelope(), vec![0, 16]);
    }

    #[test]
    fn test_unknown_discriminator() {
        let err = Message::from_envelope(&[0x03, 0xe7]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(999)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = Message::from(TurnUpdate { current_player_id: 1 }).to_envelope();
        bytes.push(0);
        let err = Message::from_envelope(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::TrailingBytes(1)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let bytes = Message::from(LobbyInfoUpdate { member_count: 1, ready_count: 0 }).to_envelope();
        let err = Message::from_envelope(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { .. }));
    }

    #[test]
    fn test_invalid_room_kind_is_rejected() {
        let err = Message::from_envelope(&[0, 3, 0, 0, 0, 9]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidEnum { name: "RoomKind", value: 9 }
        ));
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 0.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
