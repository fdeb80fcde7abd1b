//! The tic-tac-toe board.

use crate::{MoveRejection, RoomError};

/// All eight winning lines, rows first, then columns, then diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// The state of the board after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Undecided,
    /// Player 1 or 2 completed a line.
    Winner(i32),
    Tie,
}

impl Verdict {
    /// The wire-level code: 0 undecided, 1 or 2 winner, -1 tie.
    pub fn code(self) -> i32 {
        match self {
            Self::Undecided => 0,
            Self::Winner(player) => player,
            Self::Tie => -1,
        }
    }
}

/// Nine cells in row-major order. Each holds 0 (empty), 1, or 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Board([i32; 9]);

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> [i32; 9] {
        self.0
    }

    /// Marks `cell` for `player` (1 or 2).
    ///
    /// # Errors
    /// [`RoomError::InvalidMove`] if the cell is off the board or taken.
    /// The board is unchanged on error.
    pub fn mark(&mut self, cell: i32, player: i32) -> Result<(), RoomError> {
        let index = usize::try_from(cell)
            .ok()
            .filter(|&i| i < self.0.len())
            .ok_or(RoomError::InvalidMove(MoveRejection::OutOfRange(cell)))?;
        if self.0[index] != 0 {
            return Err(RoomError::InvalidMove(MoveRejection::Occupied(index)));
        }
        self.0[index] = player;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.0 = [0; 9];
    }

    /// Checks lines in order and reports the first complete one. A full
    /// board with no line is a tie.
    pub fn who_has_won(&self) -> Verdict {
        for [a, b, c] in LINES {
            let owner = self.0[a];
            if owner != 0 && owner == self.0[b] && owner == self.0[c] {
                return Verdict::Winner(owner);
            }
        }
        if self.0.iter().all(|&cell| cell != 0) {
            Verdict::Tie
        } else {
            Verdict::Undecided
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(cells: [i32; 9]) -> Board {
        Board(cells)
    }

    #[test]
    fn test_every_line_wins() {
        for line in LINES {
            let mut cells = [0; 9];
            for i in line {
                cells[i] = 2;
            }
            assert_eq!(board(cells).who_has_won(), Verdict::Winner(2), "line {line:?}");
        }
    }

    #[test]
    fn test_full_board_without_line_is_tie() {
        let b = board([1, 2, 1, 1, 2, 2, 2, 1, 1]);
        assert_eq!(b.who_has_won(), Verdict::Tie);
        assert_eq!(b.who_has_won().code(), -1);
    }

    #[test]
    fn test_full_board_with_line_is_win() {
        let b = board([1, 1, 1, 2, 2, 1, 2, 1, 2]);
        assert_eq!(b.who_has_won(), Verdict::Winner(1));
    }

    #[test]
    fn test_empty_and_partial_are_undecided() {
        assert_eq!(Board::new().who_has_won(), Verdict::Undecided);
        assert_eq!(board([1, 2, 0, 0, 1, 0, 0, 0, 2]).who_has_won().code(), 0);
    }

    #[test]
    fn test_mark_rejects_taken_and_out_of_range() {
        let mut b = Board::new();
        b.mark(4, 1).unwrap();
        assert_eq!(
            b.mark(4, 2),
            Err(RoomError::InvalidMove(MoveRejection::Occupied(4)))
        );
        assert_eq!(
            b.mark(9, 2),
            Err(RoomError::InvalidMove(MoveRejection::OutOfRange(9)))
        );
        assert_eq!(
            b.mark(-1, 2),
            Err(RoomError::InvalidMove(MoveRejection::OutOfRange(-1)))
        );
        assert_eq!(b.cells(), [0, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_reset_clears() {
        let mut b = board([1; 9]);
        b.reset();
        assert_eq!(b, Board::new());
    }
}
