//! Player session metadata for Parlor.
//!
//! The server keeps one [`PlayerInfo`] per connection in a
//! [`SessionRegistry`], keyed by [`ConnectionId`]. Rooms read and write
//! it as a player moves through login, lobby, and games:
//!
//! 1. **Login** claims a nickname ([`SessionRegistry::claim_nickname`]),
//!    which must be unique ignoring case.
//! 2. **Lobby** spawns an [`Avatar`] at a random spot in the [`Arena`]
//!    and clears it again when the player leaves.
//! 3. Whichever room finally evicts the connection drops the entry.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)     ← reads nicknames, moves avatars
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Transport / Protocol   ← ConnectionId, Position, AvatarData
//! ```
//!
//! [`ConnectionId`]: parlor_transport::ConnectionId

mod error;
mod player;
mod registry;

pub use error::SessionError;
pub use player::{Arena, Avatar, PlayerInfo};
pub use registry::SessionRegistry;
