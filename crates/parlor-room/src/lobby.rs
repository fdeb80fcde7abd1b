//! The lobby: avatars, chat, and matchmaking by readiness.

use parlor_protocol::{
    AvatarJoin, AvatarLeave, ChatMessage, ChatRequest, LobbyInfoUpdate, Message, MessageChannel,
    MoveCommand, MoveRequest, Position, RoomJoinedEvent, RoomKind,
};
use parlor_transport::ConnectionId;

use crate::{Destination, GameOutcome, Members, Room, RoomContext, RouterCommand};

/// Where logged-in players wait between games.
///
/// Each member gets an avatar on entry. Members flag themselves ready;
/// as soon as two are, the two who readied first leave for a game.
#[derive(Debug, Default)]
pub struct LobbyRoom {
    members: Members,
    /// Ready members, earliest first.
    ready: Vec<ConnectionId>,
}

impl LobbyRoom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    pub fn is_ready(&self, id: ConnectionId) -> bool {
        self.ready.contains(&id)
    }

    /// Announces a finished game to everyone in the lobby.
    pub fn on_game_ended(&mut self, outcome: &GameOutcome) {
        self.members
            .broadcast(&ChatMessage::notice(outcome.summary()).into());
    }

    fn broadcast_counts(&mut self) {
        let update = LobbyInfoUpdate {
            member_count: count(self.members.len()),
            ready_count: count(self.ready.len()),
        };
        self.members.broadcast(&update.into());
    }

    fn handle_ready(&mut self, ready: bool, sender: ConnectionId, ctx: &mut RoomContext) {
        if ready {
            if !self.ready.contains(&sender) {
                self.ready.push(sender);
            }
        } else {
            self.ready.retain(|&id| id != sender);
        }
        tracing::debug!(conn_id = %sender, ready, ready_count = self.ready.len(), "ready status changed");

        if self.ready.len() >= 2 {
            self.start_match(ctx);
        } else {
            self.broadcast_counts();
        }
    }

    /// Hands the two earliest-ready members to the router for a game.
    fn start_match(&mut self, ctx: &mut RoomContext) {
        let (first, second) = (self.ready[0], self.ready[1]);
        let a = self.remove_member(first, ctx);
        let b = self.remove_member(second, ctx);
        match (a, b) {
            (Some(a), Some(b)) => {
                tracing::info!(player1 = %first, player2 = %second, "match made");
                ctx.push(RouterCommand::StartGame { players: [a, b] });
            }
            (Some(channel), None) | (None, Some(channel)) => {
                ctx.push(RouterCommand::Transfer {
                    channel,
                    to: Destination::Lobby,
                });
            }
            (None, None) => {}
        }
    }

    fn handle_chat(&mut self, request: ChatRequest, sender: ConnectionId, ctx: &mut RoomContext) {
        let Some(avatar) = ctx.sessions.avatar(sender).copied() else {
            return;
        };
        let message: Message = ChatMessage {
            sender_id: avatar.id,
            text: format!("{}: {}", ctx.sessions.nickname(sender), request.text),
            whisper: request.whisper,
        }
        .into();

        if !request.whisper {
            self.members.broadcast(&message);
            return;
        }
        let radius = ctx.config.whisper_radius;
        let sessions = &ctx.sessions;
        self.members.broadcast_where(&message, |id| {
            sessions
                .avatar(id)
                .is_some_and(|other| other.position.distance(&avatar.position) <= radius)
        });
    }

    fn handle_move(&mut self, request: MoveRequest, sender: ConnectionId, ctx: &mut RoomContext) {
        let target = Position::new(request.x, request.y, request.z);
        if !ctx.config.arena.contains(&target) {
            tracing::debug!(conn_id = %sender, ?target, "move outside arena rejected");
            return;
        }
        let Some(avatar) = ctx.sessions.get_mut(sender).and_then(|p| p.avatar.as_mut()) else {
            return;
        };
        avatar.position = target;
        let command = MoveCommand {
            x: target.x,
            y: target.y,
            z: target.z,
            actor_id: avatar.id,
        };
        self.members.broadcast(&command.into());
    }
}

impl Room for LobbyRoom {
    fn kind(&self) -> RoomKind {
        RoomKind::Lobby
    }

    fn members(&self) -> &Members {
        &self.members
    }

    fn members_mut(&mut self) -> &mut Members {
        &mut self.members
    }

    fn add_member(&mut self, channel: MessageChannel, ctx: &mut RoomContext) {
        let id = channel.id();
        tracing::info!(room = %self.kind(), conn_id = %id, "member joined");
        self.members.insert(channel, ctx.now);
        self.members
            .send_to(id, &RoomJoinedEvent { room: RoomKind::Lobby }.into());

        let avatar = ctx.sessions.spawn_avatar(id, &ctx.config.arena);
        let notice = format!("Client '{}' has joined the lobby!", ctx.sessions.nickname(id));
        self.members.broadcast(&ChatMessage::notice(notice).into());

        let roster = self
            .members
            .ids()
            .into_iter()
            .filter_map(|member| ctx.sessions.avatar(member))
            .map(|a| a.to_data())
            .collect();
        let join = AvatarJoin {
            id: avatar.id,
            appearance: avatar.appearance,
            position: avatar.position,
            roster,
        };
        self.members.broadcast(&join.into());
        self.broadcast_counts();
    }

    fn on_member_removed(&mut self, id: ConnectionId, ctx: &mut RoomContext) {
        self.ready.retain(|&r| r != id);
        if let Some(avatar) = ctx.sessions.clear_avatar(id) {
            self.members.broadcast(&AvatarLeave { id: avatar.id }.into());
        }
        self.broadcast_counts();
    }

    fn handle_message(&mut self, message: Message, sender: ConnectionId, ctx: &mut RoomContext) {
        match message {
            Message::ChangeReadyStatusRequest(req) => self.handle_ready(req.ready, sender, ctx),
            Message::ChatRequest(req) => self.handle_chat(req, sender, ctx),
            Message::MoveRequest(req) => self.handle_move(req, sender, ctx),
            Message::Heartbeat(_) => {}
            other => {
                tracing::debug!(conn_id = %sender, kind = ?other.kind(), "ignored in lobby");
            }
        }
    }
}

/// Headcounts go over the wire as `i32`.
fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
