//! # Parlor
//!
//! A room-based multiplayer game server. Clients connect over TCP, speak
//! a length-prefixed binary protocol, and move through a fixed cycle of
//! rooms:
//!
//! ```text
//! Login → Lobby → Game → GameOver → Lobby → …
//! ```
//!
//! The game is tic-tac-toe. Everything runs on one task, in ticks: accept
//! new connections, update every room once, wait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parlor::prelude::*;
//!
//! # async fn start() -> Result<(), ParlorError> {
//! let server = ParlorServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod router;
mod server;

pub use config::{CodecKind, ServerConfig};
pub use error::{ConfigError, ParlorError};
pub use router::Router;
pub use server::{ParlorServer, ParlorServerBuilder};

/// Common imports for running and observing a server.
pub mod prelude {
    pub use crate::{
        CodecKind, ConfigError, ParlorError, ParlorServer, ParlorServerBuilder, Router,
        ServerConfig,
    };
    pub use parlor_protocol::{Message, MessageChannel, RoomKind};
    pub use parlor_room::{GameId, GameOutcome, RoomConfig, ServerEvent};
    pub use parlor_tick::TickPolicy;
    pub use parlor_transport::{Connection, ConnectionId};
}
