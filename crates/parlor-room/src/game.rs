//! A single game of tic-tac-toe between two seated players.

use parlor_protocol::{
    GameNameInit, MakeMoveResult, Message, MessageChannel, RoomJoinedEvent, RoomKind, TurnUpdate,
};
use parlor_transport::ConnectionId;

use crate::board::{Board, Verdict};
use crate::{
    Destination, GameId, GameOutcome, GamePhase, Members, MoveRejection, Room, RoomContext,
    RoomError, RouterCommand,
};

/// How a game ended, by seat index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Win { winner: usize },
    Tie,
    Concession { winner: usize },
    Forfeit { winner: usize },
}

impl Ending {
    /// The line shown to the player in `seat` on the game-over screen.
    fn verdict(self, seat: usize) -> &'static str {
        match self {
            Self::Tie => "It was a tie!",
            Self::Win { winner } if winner == seat => "You have won.",
            Self::Win { .. } => "You have lost.",
            Self::Concession { winner } if winner == seat => "You have won by concession.",
            Self::Concession { .. } => "You have lost by concession.",
            Self::Forfeit { winner } if winner == seat => "You have won due to disconnection.",
            Self::Forfeit { .. } => "You have lost due to disconnection.",
        }
    }

    fn outcome(self, names: &[String; 2]) -> GameOutcome {
        let pair = |winner: usize| (names[winner].clone(), names[1 - winner].clone());
        match self {
            Self::Win { winner } => {
                let (winner, loser) = pair(winner);
                GameOutcome::Won { winner, loser }
            }
            Self::Tie => GameOutcome::Tied {
                first: names[0].clone(),
                second: names[1].clone(),
            },
            Self::Concession { winner } => {
                let (winner, loser) = pair(winner);
                GameOutcome::Conceded { winner, loser }
            }
            Self::Forfeit { winner } => {
                let (winner, loser) = pair(winner);
                GameOutcome::Forfeited { winner, loser }
            }
        }
    }
}

/// One game instance, created by the router for a matched pair and
/// retired once it concludes.
///
/// Seat 0 moves first and is reported to clients as player 1.
#[derive(Debug)]
pub struct GameRoom {
    id: GameId,
    members: Members,
    phase: GamePhase,
    seats: Vec<ConnectionId>,
    names: [String; 2],
    board: Board,
    turn: usize,
}

impl GameRoom {
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            members: Members::new(),
            phase: GamePhase::WaitingToStart,
            seats: Vec::with_capacity(2),
            names: Default::default(),
            board: Board::new(),
            turn: 0,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Seat index whose move it is.
    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn seats(&self) -> &[ConnectionId] {
        &self.seats
    }

    /// Nicknames in seat order, as captured when the game started.
    pub fn player_names(&self) -> &[String; 2] {
        &self.names
    }

    /// Seats `players` in order and opens play.
    ///
    /// # Errors
    /// [`RoomError::InvalidState`] if the game has already started. Both
    /// players are then sent back to the lobby instead.
    pub fn start_game(
        &mut self,
        players: [MessageChannel; 2],
        ctx: &mut RoomContext,
    ) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(GamePhase::InPlay) {
            for channel in players {
                ctx.push(RouterCommand::Transfer {
                    channel,
                    to: Destination::Lobby,
                });
            }
            return Err(RoomError::InvalidState(self.phase));
        }
        self.phase = GamePhase::InPlay;

        for channel in players {
            let id = channel.id();
            self.add_member(channel, ctx);
            self.seats.push(id);
        }
        self.names = [0, 1].map(|seat| ctx.sessions.nickname(self.seats[seat]).to_string());

        let [player1, player2] = self.names.clone();
        self.members
            .broadcast(&GameNameInit { player1, player2 }.into());
        self.broadcast_turn();
        tracing::info!(game = %self.id, player1 = %self.names[0], player2 = %self.names[1], "game started");
        Ok(())
    }

    /// Applies a move by `sender` on `cell`, then settles the board.
    ///
    /// # Errors
    /// Rejected moves change nothing and broadcast nothing:
    /// - [`RoomError::InvalidState`] outside of play;
    /// - [`RoomError::NotSeated`] if `sender` isn't a player here;
    /// - [`RoomError::InvalidMove`] out of turn, off the board, or on a
    ///   marked cell.
    pub fn make_move(
        &mut self,
        cell: i32,
        sender: ConnectionId,
        ctx: &mut RoomContext,
    ) -> Result<(), RoomError> {
        if !self.phase.is_in_play() {
            return Err(RoomError::InvalidState(self.phase));
        }
        let seat = self.seat_of(sender).ok_or(RoomError::NotSeated(sender))?;
        if seat != self.turn {
            return Err(RoomError::InvalidMove(MoveRejection::OutOfTurn));
        }
        let mark = player_number(seat);
        self.board.mark(cell, mark)?;

        let result = MakeMoveResult {
            mover: mark,
            board: self.board.cells(),
        };
        self.members.broadcast(&result.into());

        match self.board.who_has_won() {
            Verdict::Undecided => {
                self.turn = 1 - self.turn;
                self.broadcast_turn();
            }
            Verdict::Tie => self.conclude(Ending::Tie, ctx),
            Verdict::Winner(player) => self.conclude(
                Ending::Win {
                    winner: seat_index(player),
                },
                ctx,
            ),
        }
        Ok(())
    }

    /// Ends the game in favour of the other player.
    pub fn concede(&mut self, sender: ConnectionId, ctx: &mut RoomContext) -> Result<(), RoomError> {
        if !self.phase.is_in_play() {
            return Err(RoomError::InvalidState(self.phase));
        }
        let seat = self.seat_of(sender).ok_or(RoomError::NotSeated(sender))?;
        self.conclude(Ending::Concession { winner: 1 - seat }, ctx);
        Ok(())
    }

    fn seat_of(&self, id: ConnectionId) -> Option<usize> {
        self.seats.iter().position(|&s| s == id)
    }

    fn broadcast_turn(&mut self) {
        let update = TurnUpdate {
            current_player_id: player_number(self.turn),
        };
        self.members.broadcast(&update.into());
    }

    /// Sends both players to the game-over room with their verdicts and
    /// asks the router to retire this room.
    fn conclude(&mut self, ending: Ending, ctx: &mut RoomContext) {
        debug_assert!(self.phase.can_transition_to(GamePhase::Concluded));
        self.phase = GamePhase::Concluded;
        let outcome = ending.outcome(&self.names);
        tracing::info!(game = %self.id, %outcome, "game concluded");

        let seats = std::mem::take(&mut self.seats);
        for (seat, id) in seats.into_iter().enumerate() {
            if let Some(channel) = self.remove_member(id, ctx) {
                ctx.push(RouterCommand::Transfer {
                    channel,
                    to: Destination::GameOver {
                        verdict: Some(ending.verdict(seat).to_string()),
                    },
                });
            }
        }
        ctx.push(RouterCommand::RetireGame {
            game: self.id,
            outcome,
        });
        self.board.reset();
        self.turn = 0;
    }
}

impl Room for GameRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::Game
    }

    fn members(&self) -> &Members {
        &self.members
    }

    fn members_mut(&mut self) -> &mut Members {
        &mut self.members
    }

    fn add_member(&mut self, channel: MessageChannel, ctx: &mut RoomContext) {
        let id = channel.id();
        tracing::info!(room = %self.kind(), game = %self.id, conn_id = %id, "member joined");
        self.members.insert(channel, ctx.now);
        self.members
            .send_to(id, &RoomJoinedEvent { room: RoomKind::Game }.into());
    }

    /// A seated player leaving mid-game forfeits.
    fn on_member_removed(&mut self, id: ConnectionId, ctx: &mut RoomContext) {
        if !self.phase.is_in_play() {
            return;
        }
        if let Some(seat) = self.seat_of(id) {
            tracing::info!(game = %self.id, conn_id = %id, "player dropped mid-game");
            self.conclude(Ending::Forfeit { winner: 1 - seat }, ctx);
        }
    }

    fn update(&mut self, ctx: &mut RoomContext) {
        let before = self.members.len();
        self.sweep(ctx);
        self.dispatch(ctx);
        let after = self.members.len();
        if after < before {
            tracing::debug!(game = %self.id, before, after, "membership dropped");
        }
    }

    fn handle_message(&mut self, message: Message, sender: ConnectionId, ctx: &mut RoomContext) {
        let result = match message {
            Message::MakeMoveRequest(req) => self.make_move(req.cell, sender, ctx),
            Message::Concede(_) => self.concede(sender, ctx),
            Message::Heartbeat(_) => Ok(()),
            other => {
                tracing::debug!(game = %self.id, conn_id = %sender, kind = ?other.kind(), "ignored in game");
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::debug!(game = %self.id, conn_id = %sender, error = %e, "request rejected");
        }
    }
}

/// Seat index to the 1-based player number clients see.
fn player_number(seat: usize) -> i32 {
    if seat == 0 { 1 } else { 2 }
}

fn seat_index(player: i32) -> usize {
    if player == 1 { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdicts_per_seat() {
        let win = Ending::Win { winner: 1 };
        assert_eq!(win.verdict(1), "You have won.");
        assert_eq!(win.verdict(0), "You have lost.");
        assert_eq!(Ending::Tie.verdict(0), "It was a tie!");
        assert_eq!(
            Ending::Concession { winner: 0 }.verdict(1),
            "You have lost by concession."
        );
        assert_eq!(
            Ending::Forfeit { winner: 0 }.verdict(0),
            "You have won due to disconnection."
        );
    }

    #[test]
    fn test_outcome_uses_seat_names() {
        let names = ["Alice".to_string(), "Bob".to_string()];
        assert_eq!(
            Ending::Win { winner: 1 }.outcome(&names),
            GameOutcome::Won {
                winner: "Bob".into(),
                loser: "Alice".into()
            }
        );
        assert_eq!(
            Ending::Forfeit { winner: 0 }.outcome(&names).summary(),
            "Alice won because Bob disconnected."
        );
    }

    #[test]
    fn test_player_numbers() {
        assert_eq!(player_number(0), 1);
        assert_eq!(player_number(1), 2);
        assert_eq!(seat_index(2), 1);
    }
}
