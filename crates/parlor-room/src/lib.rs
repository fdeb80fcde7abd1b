//! Rooms for Parlor.
//!
//! Every connection lives in exactly one room at a time, and rooms form
//! the session lifecycle:
//!
//! ```text
//! Login → Lobby → Game → GameOver → Lobby → …
//! ```
//!
//! Rooms are plain structs updated in turn by the router on the tick
//! task. They never reach into each other; moving a player on is a
//! [`RouterCommand`] pushed into the [`RoomContext`].
//!
//! # Key types
//!
//! - [`Room`]: the trait with the shared sweep/dispatch loop
//! - [`Members`]: a room's channels and liveness stamps
//! - [`LoginRoom`], [`LobbyRoom`], [`GameRoom`], [`GameOverRoom`]
//! - [`GamePhase`]: a game's lifecycle state machine
//! - [`RoomConfig`]: timeouts, caps, and the arena

mod board;
mod config;
mod context;
mod error;
mod game;
mod game_over;
mod lobby;
mod login;
mod room;

pub use board::{Board, Verdict};
pub use config::{GamePhase, RoomConfig};
pub use context::{
    Destination, GameId, GameOutcome, RoomContext, RouterCommand, ServerEvent,
};
pub use error::{MoveRejection, RoomError};
pub use game::GameRoom;
pub use game_over::GameOverRoom;
pub use lobby::LobbyRoom;
pub use login::LoginRoom;
pub use room::{Members, Room};
