//! Error types for the room layer.

use parlor_transport::ConnectionId;

use crate::GamePhase;

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// It is the other player's turn.
    OutOfTurn,
    /// The cell index is outside `0..9`.
    OutOfRange(i32),
    /// The cell already holds a mark.
    Occupied(usize),
}

impl std::fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfTurn => write!(f, "not this player's turn"),
            Self::OutOfRange(cell) => write!(f, "cell {cell} is off the board"),
            Self::Occupied(cell) => write!(f, "cell {cell} is already marked"),
        }
    }
}

/// Errors from room operations.
///
/// None of these reach the tick loop. Rooms log them and carry on;
/// the offending request simply has no effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The game is in a phase that doesn't allow this operation, e.g.
    /// starting a game twice or moving after it ended.
    #[error("invalid game phase for this operation: {0}")]
    InvalidState(GamePhase),

    /// The sender is a member but not one of the two seated players.
    #[error("{0} is not seated in this game")]
    NotSeated(ConnectionId),

    /// A move broke the rules.
    #[error("invalid move: {0}")]
    InvalidMove(MoveRejection),
}
