//! What a room sees of the world while it updates.
//!
//! Rooms never hold references to each other. When a member has to move
//! on, the room pushes a [`RouterCommand`] into the [`RoomContext`] and
//! the router applies it after that room's update returns. Anything worth
//! telling observers about goes out as a [`ServerEvent`].

use std::fmt;
use std::time::Instant;

use parlor_protocol::MessageChannel;
use parlor_session::SessionRegistry;
use parlor_transport::ConnectionId;

use crate::RoomConfig;

/// Identifies one game room for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(u64);

impl GameId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a game ended, by nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Three in a row.
    Won { winner: String, loser: String },
    /// Full board, no line.
    Tied { first: String, second: String },
    Conceded { winner: String, loser: String },
    /// The loser's connection went away mid-game.
    Forfeited { winner: String, loser: String },
}

impl GameOutcome {
    /// The one-line summary announced in the lobby.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Won { winner, loser } => write!(f, "{winner} won against {loser}."),
            Self::Tied { first, second } => write!(f, "{first} and {second} tied."),
            Self::Conceded { winner, loser } => write!(f, "{loser} conceded to {winner}."),
            Self::Forfeited { winner, loser } => {
                write!(f, "{winner} won because {loser} disconnected.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// Where a transferred member should go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Lobby,
    /// The game-over screen, with the line the player should read there.
    GameOver { verdict: Option<String> },
}

/// A request from a room to the router.
///
/// Every channel carried here has already been removed from the room
/// that pushed the command; the router is its only owner until it lands
/// somewhere.
#[derive(Debug)]
pub enum RouterCommand {
    Transfer {
        channel: MessageChannel,
        to: Destination,
    },
    /// Seat these two in a fresh game room, in this order.
    StartGame { players: [MessageChannel; 2] },
    /// The game has concluded and holds no members; destroy it.
    RetireGame { game: GameId, outcome: GameOutcome },
}

/// Notable things that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    PlayerAccepted {
        conn: ConnectionId,
        nickname: String,
    },
    /// A connection was closed by the server. `nickname` is empty if the
    /// player never logged in.
    PlayerEvicted {
        conn: ConnectionId,
        nickname: String,
    },
    GameStarted {
        game: GameId,
        players: [String; 2],
    },
    GameEnded {
        game: GameId,
        outcome: GameOutcome,
    },
}

// ---------------------------------------------------------------------------
// RoomContext
// ---------------------------------------------------------------------------

/// Shared state handed to each room in turn during a tick.
#[derive(Debug)]
pub struct RoomContext {
    /// The tick's timestamp. Every liveness check in one tick uses it.
    pub now: Instant,
    pub sessions: SessionRegistry,
    pub config: RoomConfig,
    commands: Vec<RouterCommand>,
    events: Vec<ServerEvent>,
}

impl RoomContext {
    pub fn new(config: RoomConfig, now: Instant) -> Self {
        Self {
            now,
            sessions: SessionRegistry::new(),
            config,
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, command: RouterCommand) {
        self.commands.push(command);
    }

    pub fn emit(&mut self, event: ServerEvent) {
        self.events.push(event);
    }

    /// Drains pending commands in the order they were pushed.
    pub fn take_commands(&mut self) -> Vec<RouterCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn take_events(&mut self) -> Vec<ServerEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_summaries() {
        let won = GameOutcome::Won {
            winner: "Alice".into(),
            loser: "Bob".into(),
        };
        assert_eq!(won.summary(), "Alice won against Bob.");

        let tied = GameOutcome::Tied {
            first: "Alice".into(),
            second: "Bob".into(),
        };
        assert_eq!(tied.summary(), "Alice and Bob tied.");

        let conceded = GameOutcome::Conceded {
            winner: "Bob".into(),
            loser: "Alice".into(),
        };
        assert_eq!(conceded.summary(), "Alice conceded to Bob.");
    }

    #[test]
    fn test_game_id_display() {
        assert_eq!(GameId::new(7).to_string(), "G-7");
    }

    #[test]
    fn test_context_drains_in_order() {
        let mut ctx = RoomContext::new(RoomConfig::default(), Instant::now());
        ctx.emit(ServerEvent::PlayerEvicted {
            conn: ConnectionId::new(1),
            nickname: String::new(),
        });
        ctx.emit(ServerEvent::PlayerEvicted {
            conn: ConnectionId::new(2),
            nickname: String::new(),
        });
        let events = ctx.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            ServerEvent::PlayerEvicted { conn, .. } if conn == ConnectionId::new(1)
        ));
        assert!(ctx.take_events().is_empty());
        assert!(ctx.take_commands().is_empty());
    }
}
