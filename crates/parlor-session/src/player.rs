//! Per-player data: nickname, lobby avatar, and the arena avatars live in.

use parlor_protocol::{AvatarData, Position};
use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// The walkable floor of the lobby, on the x/z plane.
///
/// Height (`y`) is not constrained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            min_x: -20.0,
            max_x: 20.0,
            min_z: -5.0,
            max_z: 15.0,
        }
    }
}

impl Arena {
    /// Returns `true` if `pos` lies on the floor, edges included.
    pub fn contains(&self, pos: &Position) -> bool {
        (self.min_x..=self.max_x).contains(&pos.x) && (self.min_z..=self.max_z).contains(&pos.z)
    }

    /// `true` if every bound is finite and each min is at most its max.
    /// Spawning only works on a well-formed arena.
    pub fn is_well_formed(&self) -> bool {
        [self.min_x, self.max_x, self.min_z, self.max_z]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_z <= self.max_z
    }

    /// A uniformly random spot on the floor at height 0.
    pub fn random_position(&self, rng: &mut impl Rng) -> Position {
        Position::new(
            rng.random_range(self.min_x..=self.max_x),
            0.0,
            rng.random_range(self.min_z..=self.max_z),
        )
    }
}

// ---------------------------------------------------------------------------
// Avatar
// ---------------------------------------------------------------------------

/// A player's presence in the lobby.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Avatar {
    /// Server-assigned, unique among live avatars. Also used as the
    /// chat sender id.
    pub id: i32,
    /// Which of the client's character models to draw (1..=4).
    pub appearance: i32,
    pub position: Position,
}

impl Avatar {
    /// Number of distinct appearances a client knows how to draw.
    pub const APPEARANCES: i32 = 4;

    pub fn to_data(&self) -> AvatarData {
        AvatarData {
            id: self.id,
            appearance: self.appearance,
            position: self.position,
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerInfo
// ---------------------------------------------------------------------------

/// Everything the server remembers about one connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerInfo {
    /// Empty until the player logs in.
    pub nickname: String,
    /// Present only while the player is in the lobby.
    pub avatar: Option<Avatar>,
}

impl PlayerInfo {
    pub fn is_logged_in(&self) -> bool {
        !self.nickname.is_empty()
    }
}
