//! Room configuration and the game phase state machine.

use std::time::Duration;

use parlor_session::Arena;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room.
///
/// Loaded as part of the server configuration; any field left out of the
/// file keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// A member with no inbound traffic for longer than this is evicted.
    ///
    /// Must be comfortably larger than the tick interval, or every member
    /// would be evicted between two of its own heartbeats.
    pub heartbeat_timeout: Duration,

    /// Connections that arrive while the login room is this full are
    /// closed straight away.
    pub max_login_members: usize,

    /// Longest accepted nickname, in characters.
    pub max_nickname_len: usize,

    /// Whispered chat reaches avatars within this distance of the sender.
    pub whisper_radius: f32,

    /// Where lobby avatars may stand.
    pub arena: Arena,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(10),
            max_login_members: 50,
            max_nickname_len: 16,
            whisper_radius: 2.0,
            arena: Arena::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// The lifecycle of one game room.
///
/// Transitions are strictly ordered, with no skipping and no way back:
///
/// ```text
/// WaitingToStart → InPlay → Concluded
/// ```
///
/// - **WaitingToStart**: created by the router, nobody seated yet.
/// - **InPlay**: two players seated, moves are accepted.
/// - **Concluded**: someone won, it was a tie, someone conceded or
///   dropped. The players have been moved on and the room is waiting to
///   be retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    WaitingToStart,
    InPlay,
    Concluded,
}

impl GamePhase {
    /// The only phase this one may move to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::WaitingToStart => Some(Self::InPlay),
            Self::InPlay => Some(Self::Concluded),
            Self::Concluded => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    pub fn is_in_play(self) -> bool {
        matches!(self, Self::InPlay)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingToStart => write!(f, "WaitingToStart"),
            Self::InPlay => write!(f, "InPlay"),
            Self::Concluded => write!(f, "Concluded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_phase_next_follows_strict_order() {
        assert_eq!(GamePhase::WaitingToStart.next(), Some(GamePhase::InPlay));
        assert_eq!(GamePhase::InPlay.next(), Some(GamePhase::Concluded));
        assert_eq!(GamePhase::Concluded.next(), None);
    }

    #[test]
    fn test_game_phase_can_transition_to() {
        assert!(GamePhase::WaitingToStart.can_transition_to(GamePhase::InPlay));
        assert!(!GamePhase::WaitingToStart.can_transition_to(GamePhase::Concluded));
        assert!(!GamePhase::InPlay.can_transition_to(GamePhase::InPlay));
        assert!(!GamePhase::Concluded.can_transition_to(GamePhase::WaitingToStart));
    }

    #[test]
    fn test_game_phase_display() {
        assert_eq!(GamePhase::WaitingToStart.to_string(), "WaitingToStart");
        assert_eq!(GamePhase::Concluded.to_string(), "Concluded");
    }

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(config.max_login_members, 50);
        assert_eq!(config.max_nickname_len, 16);
        assert_eq!(config.whisper_radius, 2.0);
    }

    #[test]
    fn test_room_config_partial_json_keeps_defaults() {
        let config: RoomConfig = serde_json::from_str(r#"{ "max_nickname_len": 8 }"#).unwrap();
        assert_eq!(config.max_nickname_len, 8);
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(10));
        assert_eq!(config.arena, Arena::default());
    }
}
